use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("expected a vector with {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector has zero or non-finite norm")]
    DegenerateVector,

    #[error("score threshold must be finite, got {0}")]
    InvalidThreshold(f32),

    #[error("invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    #[error("stored record {id} is corrupt: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("storage operation `{operation}` timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}
