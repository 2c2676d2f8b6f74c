use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by key-value store backends regardless of where the bytes live.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored value exists but is not valid JSON.
    #[error("stored value for `{key}` is corrupted")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// The key cannot be mapped onto the backend's namespace.
    #[error("invalid storage key `{key}`")]
    InvalidKey { key: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
