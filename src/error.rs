use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;
use crate::remote::error::ApiError;
use crate::state::state_machine::InvalidTransition;

/// Errors that can occur in service layer operations.
///
/// Preconditions and invalid-state errors fail fast to the caller; remote
/// trouble is resolved asynchronously through the action queue and only
/// surfaces here when an operation bypasses it.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required selections are missing; the operation was not attempted.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Operation cannot be performed in the current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Operation clashes with remote state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Device-local storage failed.
    #[error("storage failure")]
    Storage(#[from] StorageError),
    /// A direct remote call failed in a way the queue does not absorb.
    #[error("remote api failure")]
    Remote(#[source] ApiError),
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Precondition(format!("validation failed: {err}"))
    }
}
