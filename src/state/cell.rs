//! Replicated, persisted single-key state.
//!
//! A [`SharedCell`] keeps one in-memory value per key, mirrors every local write
//! to the [`KeyValueStore`] and the broadcast channel, and applies writes from
//! other replicas as they arrive. Conflicts resolve by arrival order only: the
//! last message delivered to a replica wins there.

use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicBool, Ordering},
};

use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{kv_store::KeyValueStore, storage::StorageError},
    state::channel::{BroadcastError, ChannelEndpoint, ChannelMessage, Transport},
};

/// Bounds required for a value to live in a [`SharedCell`].
pub trait CellValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CellValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Failure of one of the side effects of a write. The local value is updated regardless.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The value could not be encoded to JSON; nothing left the process.
    #[error("failed to encode value for `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// The store rejected the value twice.
    #[error("failed to persist `{key}`")]
    Persistence {
        key: String,
        #[source]
        source: StorageError,
    },
    /// The channel rejected the message twice.
    #[error("failed to broadcast `{key}`")]
    Broadcast {
        key: String,
        #[source]
        source: BroadcastError,
    },
}

struct CellInner<T> {
    key: String,
    value: watch::Sender<T>,
    store: Arc<dyn KeyValueStore>,
    endpoint: ChannelEndpoint,
    observers: Mutex<IndexMap<Uuid, Observer<T>>>,
    degraded: AtomicBool,
}

impl<T: CellValue> CellInner<T> {
    fn replace(&self, next: T) {
        self.value.send_replace(next.clone());
        self.notify(&next);
    }

    fn notify(&self, value: &T) {
        // Snapshot the observers so callbacks may subscribe or unsubscribe freely.
        let observers: Vec<Observer<T>> = match self.observers.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        for observer in observers {
            observer(value);
        }
    }

    fn apply_inbound(&self, value: Value) {
        match serde_json::from_value::<T>(value) {
            Ok(next) => {
                debug!(key = %self.key, "applied remote write");
                self.replace(next);
            }
            Err(err) => warn!(key = %self.key, error = %err, "ignoring undecodable remote write"),
        }
    }

    fn persist(&self, encoded: &Value) -> Result<(), StorageError> {
        match self.store.set(&self.key, encoded) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(key = %self.key, error = %err, "persisting failed; retrying once");
                self.store.set(&self.key, encoded)
            }
        }
    }

    fn publish(&self, encoded: Value) -> Result<(), BroadcastError> {
        let message = ChannelMessage {
            key: self.key.clone(),
            value: encoded,
        };
        match self.endpoint.publish(message.clone()) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(key = %self.key, error = %err, "broadcast failed; retrying once");
                self.endpoint.publish(message)
            }
        }
    }
}

/// Replicated cell for a single key.
///
/// Dropping the cell stops its listener; other replicas are unaffected.
pub struct SharedCell<T: CellValue> {
    inner: Arc<CellInner<T>>,
    listener: JoinHandle<()>,
}

impl<T: CellValue> SharedCell<T> {
    /// Open a replica of `key`, seeded from the store when a value is present.
    ///
    /// `initial` is used when the store holds nothing usable and is not written
    /// back until the first explicit write. Must be called inside a Tokio runtime:
    /// the replica spawns a listener task applying inbound messages for its key.
    pub fn open(
        key: impl Into<String>,
        initial: T,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let key = key.into();
        let (endpoint, mut inbox) = ChannelEndpoint::join(transport);

        let mut degraded = false;
        let seed = match store.get(&key) {
            Ok(Some(stored)) => match serde_json::from_value::<T>(stored) {
                Ok(value) => {
                    info!(key = %key, "restored persisted value");
                    value
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "persisted value is undecodable; using initial value");
                    initial
                }
            },
            Ok(None) => initial,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to read persisted value; using initial value");
                degraded = true;
                initial
            }
        };

        let (value, _rx) = watch::channel(seed);
        let inner = Arc::new(CellInner {
            key: key.clone(),
            value,
            store,
            endpoint,
            observers: Mutex::new(IndexMap::new()),
            degraded: AtomicBool::new(degraded),
        });

        let weak = Arc::downgrade(&inner);
        let listener = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                if message.key != key {
                    continue;
                }
                let Some(inner) = Weak::upgrade(&weak) else {
                    break;
                };
                inner.apply_inbound(message.value);
            }
            debug!(key = %key, "cell listener stopped");
        });

        Self { inner, listener }
    }

    /// Key this cell replicates.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Current in-memory value.
    pub fn read(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value: persist it, publish it, then adopt it locally.
    ///
    /// The local value is updated even when persistence or publishing fails; in
    /// that case the cell is flagged degraded and the first failure is returned.
    pub fn write(&self, next: T) -> Result<(), WriteError> {
        let key = &self.inner.key;
        let encoded = match serde_json::to_value(&next) {
            Ok(encoded) => encoded,
            Err(source) => {
                self.inner.replace(next);
                self.inner.degraded.store(true, Ordering::SeqCst);
                return Err(WriteError::Encode {
                    key: key.clone(),
                    source,
                });
            }
        };

        let persisted = self.inner.persist(&encoded);
        let published = self.inner.publish(encoded);
        self.inner.replace(next);

        match (persisted, published) {
            (Ok(()), Ok(())) => {
                self.inner.degraded.store(false, Ordering::SeqCst);
                Ok(())
            }
            (Err(source), published) => {
                if let Err(err) = published {
                    warn!(key = %key, error = %err, "broadcast also failed");
                }
                warn!(key = %key, error = %source, "write kept locally only; cell degraded");
                self.inner.degraded.store(true, Ordering::SeqCst);
                Err(WriteError::Persistence {
                    key: key.clone(),
                    source,
                })
            }
            (Ok(()), Err(source)) => {
                warn!(key = %key, error = %source, "write persisted but not broadcast; cell degraded");
                self.inner.degraded.store(true, Ordering::SeqCst);
                Err(WriteError::Broadcast {
                    key: key.clone(),
                    source,
                })
            }
        }
    }

    /// Compute the next value from the local one and write it, returning what was written.
    ///
    /// The current value is read from memory, not from the store, so a remote
    /// write landing between the read and the write is overwritten.
    pub fn update<F>(&self, f: F) -> Result<T, WriteError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.read());
        self.write(next.clone())?;
        Ok(next)
    }

    /// Persist and publish the current local value again.
    pub fn resync(&self) -> Result<(), WriteError> {
        self.write(self.read())
    }

    /// Whether the last write, or the initial load, failed to reach the store or channel.
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }

    /// Apply a message received from another replica.
    ///
    /// Messages for other keys are ignored. The listener calls this for every
    /// inbound message; it is public so contexts can feed messages by hand.
    pub fn receive(&self, message: ChannelMessage) {
        if message.key == self.inner.key {
            self.inner.apply_inbound(message.value);
        }
    }

    /// Register `observer`, called with every new local value.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let mut guard = match self.inner.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(id, Arc::new(observer));
        Subscription {
            id,
            cell: Arc::downgrade(&self.inner),
        }
    }

    /// Receiver notified whenever the local value changes.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.value.subscribe()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        match self.inner.observers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Stop applying remote writes. Local reads and writes keep working.
    pub fn close(&self) {
        self.listener.abort();
    }
}

impl<T: CellValue> Drop for SharedCell<T> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Registration handle returned by [`SharedCell::subscribe`].
pub struct Subscription<T: CellValue> {
    id: Uuid,
    cell: Weak<CellInner<T>>,
}

impl<T: CellValue> Subscription<T> {
    /// Remove exactly this registration.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl<T: CellValue> Drop for Subscription<T> {
    fn drop(&mut self) {
        let Some(inner) = self.cell.upgrade() else {
            return;
        };
        let mut guard = match inner.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.shift_remove(&self.id);
    }
}
