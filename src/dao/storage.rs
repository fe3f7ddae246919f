use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by match-store backends regardless of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend cannot be reached or failed internally.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Conditional write lost the race: the record moved on since the
    /// writer last fetched it.
    #[error("version conflict: expected to replace version {expected}, found {actual}")]
    Conflict {
        /// Version the writer expected to replace.
        expected: u64,
        /// Version actually stored.
        actual: u64,
    },
    /// No record exists under the given match id.
    #[error("match `{0}` not found in store")]
    NotFound(uuid::Uuid),
    /// A record already exists under the given match id.
    #[error("match `{0}` already exists in store")]
    AlreadyExists(uuid::Uuid),
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
