use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Per-subscriber buffer of the display stream.
pub const DISPLAY_STREAM_CAPACITY: usize = 16;

/// Broadcast hub fanning display events out to SSE connections.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of connected streams.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
