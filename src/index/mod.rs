//! Reeltag Tag Index
//!
//! Read paths over the label table:
//!
//! - **LabelEnumerator**: range scan over `["LABEL", "VIDEO")` → distinct labels
//! - **TagIndexReader**: equality query on `LABEL#<label>` → distinct object keys
//!
//! # Architecture
//!
//! ```text
//! GET /api/labels/cats
//!        ↓
//! keys: validate "cats" → "LABEL#cats"
//!        ↓
//! collect: fetch page → extract ObjectKey → dedup → next page ... → sort
//!        ↓
//! ["cat1.mp4", "cat2.mp4"]
//! ```

pub mod collect;
pub mod error;
pub mod keys;
mod labels;
mod tag_index;

pub use collect::{collect_distinct, DedupStrategy, Listing};
pub use error::{IndexError, IndexResult};
pub use labels::LabelEnumerator;
pub use tag_index::TagIndexReader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Options shared by both readers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub dedup: DedupStrategy,
    /// Rows per page requested from the store (backend default when `None`)
    pub page_size: Option<u32>,
}

/// What callers do when the store fails mid-listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Surface the failure as an error
    #[default]
    Propagate,
    /// Answer with whatever was collected, flagged incomplete
    Degrade,
}

impl FailurePolicy {
    /// Apply the policy to a listing result.
    ///
    /// Under `Degrade` a store failure becomes an incomplete [`Listing`];
    /// validation errors always pass through.
    pub fn apply(self, result: IndexResult<Listing>) -> IndexResult<Listing> {
        match (self, result) {
            (FailurePolicy::Degrade, Err(IndexError::StoreUnavailable { source, partial })) => {
                tracing::error!(
                    error = %source,
                    partial = partial.len(),
                    "Store failure masked, returning partial listing"
                );
                Ok(Listing::partial(partial))
            }
            (_, result) => result,
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "propagate" => Ok(FailurePolicy::Propagate),
            "degrade" => Ok(FailurePolicy::Degrade),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Propagate => write!(f, "propagate"),
            FailurePolicy::Degrade => write!(f, "degrade"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn store_failure() -> IndexResult<Listing> {
        Err(IndexError::StoreUnavailable {
            source: StoreError::Unavailable("connection reset".to_string()),
            partial: vec!["cats".to_string()],
        })
    }

    #[test]
    fn test_propagate_keeps_error() {
        let result = FailurePolicy::Propagate.apply(store_failure());
        assert!(matches!(result, Err(IndexError::StoreUnavailable { .. })));
    }

    #[test]
    fn test_degrade_returns_incomplete_listing() {
        let listing = FailurePolicy::Degrade.apply(store_failure()).unwrap();
        assert_eq!(listing.values, vec!["cats"]);
        assert!(!listing.complete);
    }

    #[test]
    fn test_degrade_passes_validation_errors() {
        let result = FailurePolicy::Degrade.apply(Err(IndexError::InvalidLabel(
            keys::KeyError::Empty,
        )));
        assert!(matches!(result, Err(IndexError::InvalidLabel(_))));
    }

    #[test]
    fn test_success_untouched() {
        let ok = Listing {
            values: vec!["cats".into()],
            pages: 1,
            records: 1,
            complete: true,
        };
        assert_eq!(FailurePolicy::Degrade.apply(Ok(ok.clone())).unwrap(), ok);
    }
}
