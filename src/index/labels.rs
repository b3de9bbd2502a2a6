//! Label enumeration
//!
//! Lists every distinct label in the table. DynamoDB cannot apply a range
//! condition in a `Query`, so this is a filtered full-table `Scan` on every
//! call; there is no cache in front of it.

use std::sync::Arc;

use super::collect::{collect_distinct, Listing};
use super::error::IndexResult;
use super::{keys, ReadOptions};
use crate::store::{PageRequest, RecordField, TableStore};

/// Enumerates distinct labels by scanning the label key range
#[derive(Clone)]
pub struct LabelEnumerator {
    store: Arc<dyn TableStore>,
    options: ReadOptions,
}

impl LabelEnumerator {
    pub fn new(store: Arc<dyn TableStore>, options: ReadOptions) -> Self {
        Self { store, options }
    }

    /// All distinct labels, ascending
    pub async fn list_labels(&self) -> IndexResult<Listing> {
        tracing::debug!(
            backend = self.store.backend(),
            dedup = %self.options.dedup,
            "Scanning label range"
        );

        let request = PageRequest::scan(keys::label_range()).with_limit(self.options.page_size);
        let listing =
            collect_distinct(&*self.store, request, RecordField::Label, self.options.dedup).await?;

        tracing::info!(
            count = listing.len(),
            pages = listing.pages,
            "Labels listed"
        );
        Ok(listing)
    }
}
