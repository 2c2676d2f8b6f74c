//! Device-scoped publish/subscribe bus used to replicate cell writes between contexts.
//!
//! Every subscriber of a channel name receives the messages published by the
//! other subscribers of that name, in publish order. Publishers never see their
//! own messages. Delivery is best-effort: subscribers joining late miss earlier
//! messages and a lagging subscriber loses the oldest ones.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Channel name shared by every replicated key unless configured otherwise.
pub const DEFAULT_CHANNEL_NAME: &str = "app-state";
/// Per-channel buffer before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Identity of a single subscriber, used for self-exclusion.
pub type SubscriberId = Uuid;

/// Payload carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Key of the replicated cell.
    pub key: String,
    /// Encoded cell value.
    pub value: Value,
}

/// Message tagged with the subscriber that published it.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Subscriber that published the message.
    pub origin: SubscriberId,
    /// Payload.
    pub message: ChannelMessage,
}

/// Errors surfaced when publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The channel was shut down and no longer accepts messages.
    #[error("broadcast channel `{channel}` is closed")]
    Closed { channel: String },
}

/// Transport seam between cells and the actual fan-out mechanism.
pub trait Transport: Send + Sync {
    /// Name the transport was opened under.
    fn name(&self) -> &str;
    /// Hand an envelope to every live subscriber (the origin filters itself out).
    fn publish(&self, envelope: Envelope) -> Result<(), BroadcastError>;
    /// Register a new raw subscriber receiving envelopes published from now on.
    fn subscribe(&self) -> broadcast::Receiver<Envelope>;
}

/// In-process channel backed by a Tokio broadcast queue.
pub struct LocalChannel {
    name: String,
    sender: broadcast::Sender<Envelope>,
    closed: AtomicBool,
}

impl LocalChannel {
    /// Construct a channel with the given per-subscriber capacity.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            name: name.into(),
            sender,
            closed: AtomicBool::new(false),
        }
    }

    /// Stop accepting publishes. Existing subscribers keep draining what was queued.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`LocalChannel::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, envelope: Envelope) -> Result<(), BroadcastError> {
        if self.is_closed() {
            return Err(BroadcastError::Closed {
                channel: self.name.clone(),
            });
        }
        // Sending with no live receiver is not a failure: nobody is listening yet.
        if self.sender.send(envelope).is_err() {
            debug!(channel = %self.name, "published with no live subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

/// Registry of named channels living on one device.
pub struct BroadcastBus {
    channels: DashMap<String, Arc<LocalChannel>>,
    capacity: usize,
}

impl BroadcastBus {
    /// Build an empty bus whose channels buffer `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Fetch the channel registered under `name`, creating it on first use.
    pub fn channel(&self, name: &str) -> Arc<LocalChannel> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(LocalChannel::new(name, self.capacity)))
            .clone()
    }

    /// Close every channel on the bus.
    pub fn close_all(&self) {
        for entry in self.channels.iter() {
            entry.value().close();
        }
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// One subscriber's publishing side.
#[derive(Clone)]
pub struct ChannelEndpoint {
    id: SubscriberId,
    transport: Arc<dyn Transport>,
}

impl ChannelEndpoint {
    /// Join `transport` under a fresh identity, returning the publisher and its inbox.
    ///
    /// The inbox is registered before this returns, so it observes every message
    /// published by other subscribers afterwards.
    pub fn join(transport: Arc<dyn Transport>) -> (Self, Inbox) {
        let id = Uuid::new_v4();
        let receiver = transport.subscribe();
        let inbox = Inbox {
            id,
            channel: transport.name().to_string(),
            receiver,
        };
        (Self { id, transport }, inbox)
    }

    /// Publish `message` to every other subscriber of the channel.
    pub fn publish(&self, message: ChannelMessage) -> Result<(), BroadcastError> {
        self.transport.publish(Envelope {
            origin: self.id,
            message,
        })
    }
}

/// One subscriber's receiving side.
pub struct Inbox {
    id: SubscriberId,
    channel: String,
    receiver: broadcast::Receiver<Envelope>,
}

impl Inbox {
    /// Wait for the next message published by another subscriber.
    ///
    /// Returns `None` once the underlying channel has been dropped.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.origin == self.id => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        channel = %self.channel,
                        skipped,
                        "subscriber lagged; oldest messages dropped"
                    );
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Inbox::recv`]; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if envelope.origin == self.id => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(
                        channel = %self.channel,
                        skipped,
                        "subscriber lagged; oldest messages dropped"
                    );
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(key: &str, value: Value) -> ChannelMessage {
        ChannelMessage {
            key: key.into(),
            value,
        }
    }

    #[test]
    fn publisher_does_not_receive_its_own_message() {
        let bus = BroadcastBus::default();
        let (publisher, mut own_inbox) = ChannelEndpoint::join(bus.channel("app-state"));
        let (_other, mut other_inbox) = ChannelEndpoint::join(bus.channel("app-state"));

        publisher.publish(message("gameState", json!(1))).unwrap();

        assert_eq!(own_inbox.try_recv(), None);
        assert_eq!(other_inbox.try_recv(), Some(message("gameState", json!(1))));
    }

    #[test]
    fn messages_arrive_in_publish_order() {
        let bus = BroadcastBus::default();
        let (publisher, _) = ChannelEndpoint::join(bus.channel("app-state"));
        let (_, mut inbox) = ChannelEndpoint::join(bus.channel("app-state"));

        for n in 0..5 {
            publisher.publish(message("gameState", json!(n))).unwrap();
        }

        let received: Vec<Value> = std::iter::from_fn(|| inbox.try_recv())
            .map(|m| m.value)
            .collect();
        assert_eq!(received, (0..5).map(|n| json!(n)).collect::<Vec<_>>());
    }

    #[test]
    fn late_subscriber_misses_earlier_messages() {
        let bus = BroadcastBus::default();
        let (publisher, _) = ChannelEndpoint::join(bus.channel("app-state"));
        publisher.publish(message("gameState", json!("early"))).unwrap();

        let (_, mut late) = ChannelEndpoint::join(bus.channel("app-state"));
        assert_eq!(late.try_recv(), None);
    }

    #[test]
    fn channel_names_are_isolated() {
        let bus = BroadcastBus::default();
        let (publisher, _) = ChannelEndpoint::join(bus.channel("app-state"));
        let (_, mut elsewhere) = ChannelEndpoint::join(bus.channel("other"));

        publisher.publish(message("gameState", json!(1))).unwrap();
        assert_eq!(elsewhere.try_recv(), None);
    }

    #[test]
    fn closed_channel_rejects_publish() {
        let bus = BroadcastBus::default();
        let (publisher, _) = ChannelEndpoint::join(bus.channel("app-state"));
        bus.close_all();

        assert_eq!(
            publisher.publish(message("gameState", json!(1))),
            Err(BroadcastError::Closed {
                channel: "app-state".into()
            })
        );
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_receiving_newest_messages() {
        let bus = BroadcastBus::new(2);
        let (publisher, _) = ChannelEndpoint::join(bus.channel("app-state"));
        let (_, mut inbox) = ChannelEndpoint::join(bus.channel("app-state"));

        for n in 0..4 {
            publisher.publish(message("gameState", json!(n))).unwrap();
        }

        assert_eq!(inbox.recv().await.map(|m| m.value), Some(json!(2)));
        assert_eq!(inbox.recv().await.map(|m| m.value), Some(json!(3)));
    }
}
