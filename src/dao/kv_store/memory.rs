use dashmap::DashMap;
use serde_json::Value;

use crate::dao::{kv_store::KeyValueStore, storage::StorageResult};

/// Volatile store used by tests and as the fallback when no data directory is usable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
