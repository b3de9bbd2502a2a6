//! Table store error types
//!
//! Defines all errors that can occur while reading the label table.

use thiserror::Error;

/// Errors that can occur in a table store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the request (transient fault, missing table, network)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Provisioned throughput or request-rate limit exceeded
    #[error("Store throttled: {0}")]
    Throttled(String),

    /// Credentials were rejected or lack permission on the table
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The requested condition cannot be expressed for this read mode
    #[error("Unsupported key condition: {0}")]
    UnsupportedCondition(String),

    /// Continuation token was not produced by this backend
    #[error("Invalid continuation token: {0}")]
    InvalidCursor(String),

    /// SQLite backend failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Throttled(_))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
