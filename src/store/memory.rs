//! In-memory table
//!
//! Rows are kept in insertion order and returned in that order, the way a
//! hash-partitioned scan hands back rows in no particular key order. Page
//! size and failure injection are configurable so callers can exercise
//! multi-page loops and mid-loop store faults.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{
    ContinuationToken, IndexRecord, Page, PageRequest, ReadMode, StoreError, StoreResult,
    TableStore,
};

const OFFSET_ATTR: &str = "offset";

/// Default rows evaluated per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Insertion-ordered in-memory table
#[derive(Debug)]
pub struct MemoryTable {
    rows: RwLock<Vec<IndexRecord>>,
    page_size: usize,
    /// Fetches served so far
    fetches: AtomicUsize,
    /// Fail every fetch once this many have succeeded
    fail_threshold: RwLock<Option<usize>>,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
            fetches: AtomicUsize::new(0),
            fail_threshold: RwLock::new(None),
        }
    }

    /// Build a table from rows, preserving their order
    pub fn from_records(records: impl IntoIterator<Item = IndexRecord>) -> Self {
        let table = Self::new();
        table.put_all(records);
        table
    }

    /// Append a row
    pub fn put(&self, record: IndexRecord) {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(record);
        }
    }

    /// Append rows in order
    pub fn put_all(&self, records: impl IntoIterator<Item = IndexRecord>) {
        if let Ok(mut rows) = self.rows.write() {
            rows.extend(records);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every fetch after the first `pages` successful ones fail
    pub fn fail_after(&self, pages: usize) {
        if let Ok(mut threshold) = self.fail_threshold.write() {
            *threshold = Some(pages);
        }
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        if let Ok(mut threshold) = self.fail_threshold.write() {
            *threshold = None;
        }
        self.fetches.store(0, Ordering::SeqCst);
    }

    /// Number of fetches served (successful or not)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_failure(&self, fetch: usize) -> StoreResult<()> {
        let threshold = self
            .fail_threshold
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        match *threshold {
            Some(limit) if fetch >= limit => Err(StoreError::Unavailable(format!(
                "injected failure on fetch {}",
                fetch + 1
            ))),
            _ => Ok(()),
        }
    }

    fn start_offset(cursor: Option<&ContinuationToken>) -> StoreResult<usize> {
        match cursor {
            None => Ok(0),
            Some(token) => token.require(OFFSET_ATTR)?.parse().map_err(|_| {
                StoreError::InvalidCursor(format!("bad offset in token '{}'", token))
            }),
        }
    }
}

#[async_trait]
impl TableStore for MemoryTable {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Page> {
        request.validate()?;

        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failure(fetch)?;

        let rows = self
            .rows
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        let limit = request
            .limit
            .map(|l| (l as usize).max(1))
            .unwrap_or(self.page_size)
            .min(self.page_size);
        let mut position = Self::start_offset(request.cursor.as_ref())?;
        let mut counted = 0;
        let mut records = Vec::new();

        // Scans count evaluated rows against the limit, queries count matches
        while position < rows.len() && counted < limit {
            let row = &rows[position];
            position += 1;

            let matched = request.condition.matches(&row.partition_key);
            if matched {
                records.push(row.clone());
            }
            if matched || request.mode == ReadMode::Scan {
                counted += 1;
            }
        }

        let next = (position < rows.len())
            .then(|| ContinuationToken::new().with(OFFSET_ATTR, position.to_string()));

        Ok(Page { records, next })
    }
}
