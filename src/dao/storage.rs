use std::error::Error;
use thiserror::Error;

use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store rejected or failed an operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failed operation.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A row could not be encoded or decoded.
    #[error("storage codec failure: {message}")]
    Codec {
        /// Human readable description of the failed conversion.
        message: String,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
    /// The referenced pending action does not exist.
    #[error("pending action `{id}` not found")]
    MissingAction {
        /// Identifier the caller supplied.
        id: Uuid,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Construct a codec error from a serde failure.
    pub fn codec(message: impl Into<String>, source: serde_json::Error) -> Self {
        StorageError::Codec {
            message: message.into(),
            source,
        }
    }
}
