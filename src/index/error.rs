//! Index error types
//!
//! Errors surfaced by the label and tag readers.

use thiserror::Error;

use super::keys::KeyError;
use crate::store::StoreError;

/// Errors that can occur while listing labels or tagged objects
#[derive(Error, Debug)]
pub enum IndexError {
    /// The store failed mid-listing. `partial` holds the sorted values
    /// collected before the failure.
    #[error("Store unavailable: {source}")]
    StoreUnavailable {
        #[source]
        source: StoreError,
        partial: Vec<String>,
    },

    /// Label rejected before key composition
    #[error("Invalid label: {0}")]
    InvalidLabel(#[from] KeyError),
}

impl IndexError {
    /// Values gathered before a store failure (empty for other errors)
    pub fn partial(&self) -> &[String] {
        match self {
            IndexError::StoreUnavailable { partial, .. } => partial,
            IndexError::InvalidLabel(_) => &[],
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
