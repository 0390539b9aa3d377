//! Error types for the redb-backed offline store.

use std::path::PathBuf;

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`RedbDaoError`] failures.
pub type RedbResult<T> = Result<T, RedbDaoError>;

/// Failures raised by the embedded queue database.
#[derive(Debug, Error)]
pub enum RedbDaoError {
    /// The database file could not be opened or created.
    #[error("failed to open offline store at `{path}`")]
    Open {
        /// Location of the database file.
        path: PathBuf,
        /// Underlying redb failure.
        #[source]
        source: redb::DatabaseError,
    },
    /// Beginning a transaction failed.
    #[error("offline store transaction failed")]
    Transaction(#[from] redb::TransactionError),
    /// Opening or deleting a table failed.
    #[error("offline store table access failed")]
    Table(#[from] redb::TableError),
    /// A read or write inside a transaction failed.
    #[error("offline store read/write failed")]
    Backend(#[from] redb::StorageError),
    /// Committing a transaction failed.
    #[error("offline store commit failed")]
    Commit(#[from] redb::CommitError),
}

impl From<RedbDaoError> for StorageError {
    fn from(err: RedbDaoError) -> Self {
        let message = err.to_string();
        StorageError::Unavailable {
            message,
            source: Box::new(err),
        }
    }
}
