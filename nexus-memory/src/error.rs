//! Error types for nexus-memory

use thiserror::Error;

/// Errors that can occur in the memory system
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Caller supplied invalid input (empty content, bad configuration, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Memory not found
    #[error("Memory not found: {0}")]
    NotFound(String),

    /// RocksDB error
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    /// Row encoding error (MessagePack)
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Row decoding error (MessagePack)
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UUID parsing error
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// On-disk state that cannot be interpreted
    #[error("Corrupted store: {0}")]
    Corrupted(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoryError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a corrupted store error
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Whether the error comes from the persistence layer rather than the caller
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Encode(_) | Self::Decode(_) | Self::Corrupted(_) | Self::Io(_)
        )
    }
}

impl From<crate::node::MemoryNodeBuilderError> for MemoryError {
    fn from(err: crate::node::MemoryNodeBuilderError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
