//! Reeltag Table Store
//!
//! Read access to the single label table. Every backend answers one kind of
//! request: fetch one page of rows for a partition-key condition, plus an
//! opaque token when more pages remain.
//!
//! - **dynamo**: DynamoDB `Scan` / `Query` through `aws-sdk-dynamodb`
//! - **sqlite**: local single-table emulation on SQLite, keyset paginated
//! - **memory**: insertion-ordered in-process table for tests and demos
//!
//! # Key layout
//!
//! ```text
//! PK = "LABEL#cats"   SK = "cat1.mp4"   Label = "cats"   ObjectKey = "cat1.mp4"
//! PK = "LABEL#cats"   SK = "cat2.mp4"   Label = "cats"   ObjectKey = "cat2.mp4"
//! PK = "LABEL#dogs"   SK = "dog1.mp4"   Label = "dogs"   ObjectKey = "dog1.mp4"
//! PK = "VIDEO#..."    (other row families, never read here)
//! ```

pub mod dynamo;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use dynamo::{AttributeNames, DynamoTable};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryTable;
pub use sqlite::SqliteTable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::index::keys;

/// A row of the label table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub partition_key: String,
    pub sort_key: String,
    pub label: Option<String>,
    pub object_key: Option<String>,
}

impl IndexRecord {
    /// Build a label-association row (`LABEL#<label>` / object key).
    ///
    /// The label is not validated; callers that accept outside input go
    /// through [`keys::label_partition_key`] first.
    pub fn label_association(label: impl Into<String>, object_key: impl Into<String>) -> Self {
        let label = label.into();
        let object_key = object_key.into();
        Self {
            partition_key: keys::compose_label_key(&label),
            sort_key: object_key.clone(),
            label: Some(label),
            object_key: Some(object_key),
        }
    }

    /// Build a row with an arbitrary partition key and no label attributes
    pub fn other(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            label: None,
            object_key: None,
        }
    }

    /// Read one of the attributes the index engine extracts
    pub fn attribute(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Label => self.label.as_deref(),
            RecordField::ObjectKey => self.object_key.as_deref(),
        }
    }
}

/// Attributes the index engine reduces over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Label,
    ObjectKey,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordField::Label => write!(f, "label"),
            RecordField::ObjectKey => write!(f, "object_key"),
        }
    }
}

/// Condition on the partition key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCondition {
    /// `PK == value`
    Equals(String),
    /// `lower <= PK < upper`
    Range { lower: String, upper: String },
}

impl KeyCondition {
    pub fn equals(value: impl Into<String>) -> Self {
        KeyCondition::Equals(value.into())
    }

    pub fn range(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        KeyCondition::Range {
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// Evaluate the condition against a partition key
    pub fn matches(&self, partition_key: &str) -> bool {
        match self {
            KeyCondition::Equals(value) => partition_key == value,
            KeyCondition::Range { lower, upper } => {
                partition_key >= lower.as_str() && partition_key < upper.as_str()
            }
        }
    }
}

/// How the backend reads the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Full traversal with a filter; the only way to apply a range condition
    Scan,
    /// Partition lookup; requires [`KeyCondition::Equals`]
    Query,
}

/// Opaque continuation token: the key attributes of the last evaluated row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationToken(BTreeMap<String, String>);

impl ContinuationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a required attribute, failing with [`StoreError::InvalidCursor`]
    pub fn require(&self, name: &str) -> StoreResult<&str> {
        self.get(name)
            .ok_or_else(|| StoreError::InvalidCursor(format!("missing '{}'", name)))
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Request for a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub mode: ReadMode,
    pub condition: KeyCondition,
    /// Maximum rows the backend evaluates for this page (backend default when `None`)
    pub limit: Option<u32>,
    pub cursor: Option<ContinuationToken>,
}

impl PageRequest {
    pub fn scan(condition: KeyCondition) -> Self {
        Self {
            mode: ReadMode::Scan,
            condition,
            limit: None,
            cursor: None,
        }
    }

    pub fn query(condition: KeyCondition) -> Self {
        Self {
            mode: ReadMode::Query,
            condition,
            limit: None,
            cursor: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<ContinuationToken>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Check that the condition fits the read mode
    pub fn validate(&self) -> StoreResult<()> {
        match (&self.mode, &self.condition) {
            (ReadMode::Query, KeyCondition::Range { .. }) => Err(StoreError::UnsupportedCondition(
                "range conditions on the partition key require a scan".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<IndexRecord>,
    /// Present while more pages remain
    pub next: Option<ContinuationToken>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Common trait for all table backends
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Fetch one page of rows matching the request
    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Page>;
}

/// Open the backend selected in configuration
pub async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn TableStore>> {
    let store: Arc<dyn TableStore> = match config.backend {
        StoreBackend::DynamoDb => Arc::new(DynamoTable::connect(config).await),
        StoreBackend::Sqlite => Arc::new(SqliteTable::open(&config.sqlite_path)?),
        StoreBackend::Memory => Arc::new(MemoryTable::new()),
    };

    tracing::info!(backend = store.backend(), "Table store opened");
    Ok(store)
}
