//! # Reeltag
//!
//! Label index and upload URLs for a video-tagging pipeline. An upstream
//! recognition step writes one row per (label, video) into a single table;
//! this crate reads that table back out and hands clients presigned URLs for
//! moving videos in and out of object storage.
//!
//! ## Modules
//!
//! - [`store`]: Paginated table access (DynamoDB, SQLite, in-memory)
//! - [`index`]: Distinct-label and per-label listings over the table
//! - [`presign`]: Time-limited upload and download URLs
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`seed`]: CSV loader for local tables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reeltag::index::{LabelEnumerator, ReadOptions, TagIndexReader};
//! use reeltag::store::{IndexRecord, SqliteTable};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = SqliteTable::open(std::path::Path::new("labels.db"))?;
//!     table.put(&IndexRecord::label_association("cats", "cat1.mp4"))?;
//!     let table = Arc::new(table);
//!
//!     let labels = LabelEnumerator::new(table.clone(), ReadOptions::default());
//!     println!("{:?}", labels.list_labels().await?.values);
//!
//!     let tags = TagIndexReader::new(table, ReadOptions::default());
//!     println!("{:?}", tags.list_objects("cats").await?.values);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod index;
pub mod logging;
pub mod presign;
pub mod seed;
pub mod store;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    ApiConfig, BucketConfig, Config, ConfigError, IndexConfig, LoggingConfig, StoreBackend,
    StoreConfig,
};

pub use index::{
    DedupStrategy, FailurePolicy, IndexError, LabelEnumerator, Listing, ReadOptions,
    TagIndexReader,
};

pub use presign::{PresignedUrl, S3UrlIssuer, SigningError, UrlIssuer, VideoUrls};

pub use seed::{SeedError, SeedImporter, SeedResult};

pub use store::{IndexRecord, MemoryTable, SqliteTable, StoreError, TableStore};
