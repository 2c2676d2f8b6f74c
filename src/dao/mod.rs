/// Durable key-value stores backing the replicated cells.
pub mod kv_store;
/// Storage error types shared by every backend.
pub mod storage;
