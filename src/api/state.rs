//! Application State
//!
//! Shared state accessible by all API handlers. Clients are built once at
//! startup and shared through `Arc`.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::index::{keys, FailurePolicy, LabelEnumerator, TagIndexReader};
use crate::presign::{S3UrlIssuer, UrlIssuer, VideoUrls};
use crate::store::{self, PageRequest, StoreResult, TableStore};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Distinct label listing
    pub labels: LabelEnumerator,
    /// Objects per label
    pub tags: TagIndexReader,
    /// Presigned upload/download URLs
    pub videos: VideoUrls,
    /// Backing table, kept for readiness probes
    pub store: Arc<dyn TableStore>,
    /// What listings do when the store fails
    pub failure_policy: FailurePolicy,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire readers and URL issuance around already-built clients
    pub fn new(store: Arc<dyn TableStore>, issuer: Arc<dyn UrlIssuer>, config: &Config) -> Self {
        let options = config.read_options();
        Self {
            labels: LabelEnumerator::new(Arc::clone(&store), options),
            tags: TagIndexReader::new(Arc::clone(&store), options),
            videos: VideoUrls::from_config(issuer, &config.bucket),
            store,
            failure_policy: config.index.on_store_failure,
            start_time: Instant::now(),
        }
    }

    /// Build the store and S3 clients from configuration
    pub async fn from_config(config: &Config) -> StoreResult<Self> {
        let store = store::open(&config.store).await?;
        let issuer: Arc<dyn UrlIssuer> = Arc::new(S3UrlIssuer::connect(&config.bucket).await);
        Ok(Self::new(store, issuer, config))
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Read one row of the label range to confirm the store answers
    pub async fn probe_store(&self) -> StoreResult<()> {
        let request = PageRequest::scan(keys::label_range()).with_limit(Some(1));
        self.store.fetch_page(&request).await.map(|_| ())
    }
}
