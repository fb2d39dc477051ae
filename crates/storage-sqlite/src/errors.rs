//! Storage error mapping into the core taxonomy.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use shoplink_core::errors::{DatabaseError, Error};

/// Errors raised by the SQLite storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Diesel(DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl From<DieselError> for StorageError {
    fn from(err: DieselError) -> Self {
        Self::Diesel(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Diesel(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::Diesel(inner) => {
                Error::Database(DatabaseError::QueryFailed(inner.to_string()))
            }
            StorageError::Pool(inner) => Error::Database(DatabaseError::Pool(inner.to_string())),
            StorageError::Migration(message) => Error::Database(DatabaseError::Internal(message)),
        }
    }
}
