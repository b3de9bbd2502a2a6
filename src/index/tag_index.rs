//! Tag Index - objects carrying a label
//!
//! Resolves a label to the object keys stored under its `LABEL#<label>`
//! partition with an equality query.
//!
//! # Example
//! ```ignore
//! let objects = reader.list_objects("cats").await?;
//! // objects.values = ["cat1.mp4", "cat2.mp4"]
//! ```
//!
//! # Design Notes
//! - Labels are validated before key composition; a rejected label never
//!   reaches the store
//! - An unknown label is an empty listing, not an error

use std::sync::Arc;

use super::collect::{collect_distinct, Listing};
use super::error::IndexResult;
use super::{keys, ReadOptions};
use crate::store::{KeyCondition, PageRequest, RecordField, TableStore};

/// Reads the object keys associated with a label
#[derive(Clone)]
pub struct TagIndexReader {
    store: Arc<dyn TableStore>,
    options: ReadOptions,
}

impl TagIndexReader {
    pub fn new(store: Arc<dyn TableStore>, options: ReadOptions) -> Self {
        Self { store, options }
    }

    /// Distinct object keys tagged with `label`, ascending
    pub async fn list_objects(&self, label: &str) -> IndexResult<Listing> {
        let partition_key = keys::label_partition_key(label)?;

        tracing::debug!(
            backend = self.store.backend(),
            partition_key = %partition_key,
            "Querying label partition"
        );

        let request = PageRequest::query(KeyCondition::Equals(partition_key))
            .with_limit(self.options.page_size);
        let listing = collect_distinct(
            &*self.store,
            request,
            RecordField::ObjectKey,
            self.options.dedup,
        )
        .await?;

        for object_key in &listing.values {
            tracing::debug!(label = %label, object_key = %object_key, "Found tagged object");
        }
        tracing::info!(label = %label, count = listing.len(), "Objects listed for label");

        Ok(listing)
    }
}
