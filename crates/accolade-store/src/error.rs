// error.rs — Error types for persistence backends.

use thiserror::Error;

/// Errors that can occur in a state/completion store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize stored data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The backing store refused the operation.
    #[error("store rejected operation: {0}")]
    Rejected(String),
}
