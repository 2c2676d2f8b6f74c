pub mod file;
pub mod memory;

use serde_json::Value;

use crate::dao::storage::StorageResult;

pub use self::{file::FileStore, memory::MemoryStore};

/// Abstraction over the device-local persistence used by replicated cells.
///
/// Writes are durable once `set` returns and overwrite any previous value. A
/// missing key is a normal outcome: callers bring their own fallback.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> StorageResult<()>;
    fn health_check(&self) -> StorageResult<()>;
}
