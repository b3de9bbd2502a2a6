//! Page-draining reduction shared by the label and tag readers
//!
//! Fetches pages one at a time until the store stops returning a
//! continuation token, extracts one attribute per row, drops duplicates and
//! sorts the survivors. The next page is requested only after the current
//! one has been fully reduced.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::error::{IndexError, IndexResult};
use crate::store::{PageRequest, RecordField, TableStore};

/// How duplicate values are detected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupStrategy {
    /// Membership set; correct for any arrival order
    #[default]
    Set,
    /// Compare against the last emitted value only. Equal values that do not
    /// arrive back to back are emitted more than once.
    Adjacent,
}

impl FromStr for DedupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "set" => Ok(DedupStrategy::Set),
            "adjacent" => Ok(DedupStrategy::Adjacent),
            other => Err(format!("unknown dedup strategy '{}'", other)),
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupStrategy::Set => write!(f, "set"),
            DedupStrategy::Adjacent => write!(f, "adjacent"),
        }
    }
}

enum Dedup {
    Set(HashSet<String>),
    Adjacent(Option<String>),
}

impl Dedup {
    fn new(strategy: DedupStrategy) -> Self {
        match strategy {
            DedupStrategy::Set => Dedup::Set(HashSet::new()),
            DedupStrategy::Adjacent => Dedup::Adjacent(None),
        }
    }

    /// Returns true when `value` should be emitted
    fn admit(&mut self, value: &str) -> bool {
        match self {
            Dedup::Set(seen) => {
                if seen.contains(value) {
                    false
                } else {
                    seen.insert(value.to_string());
                    true
                }
            }
            Dedup::Adjacent(last) => {
                if last.as_deref() == Some(value) {
                    false
                } else {
                    *last = Some(value.to_string());
                    true
                }
            }
        }
    }
}

/// Outcome of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Distinct values, ascending
    pub values: Vec<String>,
    /// Pages fetched
    pub pages: usize,
    /// Rows inspected across all pages
    pub records: usize,
    /// False when the listing was cut short by a store failure
    pub complete: bool,
}

impl Listing {
    /// A listing salvaged from a failed run
    pub fn partial(values: Vec<String>) -> Self {
        Self {
            values,
            pages: 0,
            records: 0,
            complete: false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Drain every page of `request` and reduce `field` to a sorted distinct list
pub async fn collect_distinct(
    store: &dyn TableStore,
    request: PageRequest,
    field: RecordField,
    strategy: DedupStrategy,
) -> IndexResult<Listing> {
    let mut request = request;
    let mut dedup = Dedup::new(strategy);
    let mut values = Vec::new();
    let mut pages = 0;
    let mut records = 0;

    loop {
        let page = match store.fetch_page(&request).await {
            Ok(page) => page,
            Err(source) => {
                tracing::error!(
                    backend = store.backend(),
                    field = %field,
                    pages,
                    collected = values.len(),
                    error = %source,
                    "Store read failed, listing aborted"
                );
                values.sort();
                return Err(IndexError::StoreUnavailable {
                    source,
                    partial: values,
                });
            }
        };

        pages += 1;
        records += page.records.len();

        for record in &page.records {
            match record.attribute(field) {
                Some(value) => {
                    if dedup.admit(value) {
                        values.push(value.to_string());
                    }
                }
                None => {
                    tracing::debug!(
                        partition_key = %record.partition_key,
                        sort_key = %record.sort_key,
                        field = %field,
                        "Row without attribute skipped"
                    );
                }
            }
        }

        match page.next {
            Some(token) => {
                tracing::trace!(token = %token, "Fetching next page");
                request.cursor = Some(token);
            }
            None => break,
        }
    }

    values.sort();

    tracing::debug!(
        backend = store.backend(),
        field = %field,
        pages,
        records,
        distinct = values.len(),
        "Listing complete"
    );

    Ok(Listing {
        values,
        pages,
        records,
        complete: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::keys;
    use crate::store::{IndexRecord, MemoryTable, StoreError};

    fn interleaved() -> MemoryTable {
        let table = MemoryTable::with_page_size(2);
        table.put_all(vec![
            IndexRecord::label_association("cats", "cat1.mp4"),
            IndexRecord::label_association("dogs", "dog1.mp4"),
            IndexRecord::label_association("cats", "cat2.mp4"),
        ]);
        table
    }

    fn label_scan() -> PageRequest {
        PageRequest::scan(keys::label_range())
    }

    #[test]
    fn test_set_dedup_ignores_order() {
        let mut dedup = Dedup::new(DedupStrategy::Set);
        let admitted: Vec<_> = ["b", "a", "b", "a", "c"]
            .into_iter()
            .filter(|v| dedup.admit(v))
            .collect();
        assert_eq!(admitted, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_adjacent_dedup_only_collapses_runs() {
        let mut dedup = Dedup::new(DedupStrategy::Adjacent);
        let admitted: Vec<_> = ["a", "a", "b", "a"]
            .into_iter()
            .filter(|v| dedup.admit(v))
            .collect();
        assert_eq!(admitted, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("SET".parse::<DedupStrategy>(), Ok(DedupStrategy::Set));
        assert_eq!(
            "adjacent".parse::<DedupStrategy>(),
            Ok(DedupStrategy::Adjacent)
        );
        assert!("fuzzy".parse::<DedupStrategy>().is_err());
    }

    #[tokio::test]
    async fn test_collect_across_pages() {
        let table = interleaved();
        let listing = collect_distinct(&table, label_scan(), RecordField::Label, DedupStrategy::Set)
            .await
            .unwrap();

        assert_eq!(listing.values, vec!["cats", "dogs"]);
        assert_eq!(listing.pages, 2);
        assert_eq!(listing.records, 3);
        assert!(listing.complete);
    }

    #[tokio::test]
    async fn test_adjacent_keeps_interleaved_duplicate() {
        let table = interleaved();
        let listing = collect_distinct(
            &table,
            label_scan(),
            RecordField::Label,
            DedupStrategy::Adjacent,
        )
        .await
        .unwrap();

        assert_eq!(listing.values, vec!["cats", "cats", "dogs"]);
    }

    #[tokio::test]
    async fn test_rows_without_attribute_are_skipped() {
        let table = MemoryTable::new();
        table.put(IndexRecord::label_association("cats", "cat1.mp4"));
        table.put(IndexRecord::other("LABEL#orphan", "x"));

        let listing = collect_distinct(&table, label_scan(), RecordField::Label, DedupStrategy::Set)
            .await
            .unwrap();
        assert_eq!(listing.values, vec!["cats"]);
        assert_eq!(listing.records, 2);
    }

    #[tokio::test]
    async fn test_failure_carries_partial_values() {
        let table = interleaved();
        table.fail_after(1);

        let err = collect_distinct(&table, label_scan(), RecordField::Label, DedupStrategy::Set)
            .await
            .unwrap_err();

        match err {
            IndexError::StoreUnavailable { source, partial } => {
                assert!(matches!(source, StoreError::Unavailable(_)));
                assert_eq!(partial, vec!["cats", "dogs"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_on_first_page_is_empty_partial() {
        let table = interleaved();
        table.fail_after(0);

        let err = collect_distinct(&table, label_scan(), RecordField::Label, DedupStrategy::Set)
            .await
            .unwrap_err();
        assert!(err.partial().is_empty());
    }
}
