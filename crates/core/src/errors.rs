//! Error taxonomy shared across the workspace.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for core and storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or missing domain data
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anything that escaped the anticipated taxonomy
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Storage-layer failures, surfaced through [`Error::Database`].
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the underlying cause is a unique-index rejection.
    ///
    /// The inbound engine uses this to detect that a concurrent writer won
    /// the mapping-creation race, in which case the record is re-resolved
    /// instead of failed.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Database(DatabaseError::UniqueViolation(_)))
    }
}
