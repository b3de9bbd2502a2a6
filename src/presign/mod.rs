//! Presigned object-storage URLs
//!
//! Signing itself is delegated to the provider SDK behind [`UrlIssuer`].
//! [`VideoUrls`] pins the parameters the HTTP surface uses: the configured
//! bucket, a six hour lifetime and `video/mp4` uploads.

mod s3;

pub use s3::S3UrlIssuer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::BucketConfig;

/// Default lifetime of an issued URL
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Content type signed into upload URLs
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "video/mp4";

/// Longest object key accepted, in bytes
pub const MAX_OBJECT_KEY_LEN: usize = 1024;

/// HTTP verb a URL grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Get => write!(f, "GET"),
            Verb::Put => write!(f, "PUT"),
        }
    }
}

/// Parameters for one signed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignRequest {
    pub bucket: String,
    pub object_key: String,
    pub verb: Verb,
    pub content_type: Option<String>,
    pub expires_in: Duration,
}

/// A signed URL and its validity window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    pub url: String,
    pub verb: Verb,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Errors returned instead of a URL
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// The provider refused to sign
    #[error("Signing failed: {0}")]
    Provider(String),
}

/// Produces signed URLs for single objects
#[async_trait]
pub trait UrlIssuer: Send + Sync {
    async fn issue(&self, request: &PresignRequest) -> Result<PresignedUrl, SigningError>;
}

/// Reject object keys that cannot address a single object
pub fn validate_object_key(object_key: &str) -> Result<(), SigningError> {
    if object_key.is_empty() {
        return Err(SigningError::InvalidObjectKey("object key is empty".to_string()));
    }
    if object_key.len() > MAX_OBJECT_KEY_LEN {
        return Err(SigningError::InvalidObjectKey(format!(
            "object key is {} bytes, limit is {}",
            object_key.len(),
            MAX_OBJECT_KEY_LEN
        )));
    }
    if object_key.chars().any(char::is_control) {
        return Err(SigningError::InvalidObjectKey(
            "object key contains a control character".to_string(),
        ));
    }
    Ok(())
}

/// Upload and download URLs for video objects in one bucket
#[derive(Clone)]
pub struct VideoUrls {
    issuer: Arc<dyn UrlIssuer>,
    bucket: String,
    ttl: Duration,
    upload_content_type: Option<String>,
}

impl VideoUrls {
    pub fn new(issuer: Arc<dyn UrlIssuer>, bucket: impl Into<String>) -> Self {
        Self {
            issuer,
            bucket: bucket.into(),
            ttl: DEFAULT_URL_TTL,
            upload_content_type: Some(DEFAULT_UPLOAD_CONTENT_TYPE.to_string()),
        }
    }

    /// Bucket, lifetime and upload content type taken from configuration
    pub fn from_config(issuer: Arc<dyn UrlIssuer>, config: &BucketConfig) -> Self {
        Self::new(issuer, config.name.clone())
            .with_ttl(config.url_ttl())
            .with_upload_content_type(config.upload_content_type.clone())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Content type uploads must be sent with; `None` leaves it unsigned
    pub fn with_upload_content_type(mut self, content_type: Option<String>) -> Self {
        self.upload_content_type = content_type;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// PUT-capable URL for uploading `object_key`
    pub async fn upload_url(&self, object_key: &str) -> Result<PresignedUrl, SigningError> {
        self.issue(object_key, Verb::Put, self.upload_content_type.clone())
            .await
    }

    /// GET-capable URL for downloading `object_key`
    pub async fn download_url(&self, object_key: &str) -> Result<PresignedUrl, SigningError> {
        self.issue(object_key, Verb::Get, None).await
    }

    async fn issue(
        &self,
        object_key: &str,
        verb: Verb,
        content_type: Option<String>,
    ) -> Result<PresignedUrl, SigningError> {
        validate_object_key(object_key)?;

        let request = PresignRequest {
            bucket: self.bucket.clone(),
            object_key: object_key.to_string(),
            verb,
            content_type,
            expires_in: self.ttl,
        };

        match self.issuer.issue(&request).await {
            Ok(url) => {
                tracing::info!(
                    bucket = %self.bucket,
                    object_key = %object_key,
                    verb = %verb,
                    expires_at = %url.expires_at,
                    "Presigned URL issued"
                );
                Ok(url)
            }
            Err(e) => {
                tracing::error!(
                    bucket = %self.bucket,
                    object_key = %object_key,
                    verb = %verb,
                    error = %e,
                    "Presigned URL could not be issued"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requests and answers with a fake URL
    #[derive(Default)]
    struct RecordingIssuer {
        requests: Mutex<Vec<PresignRequest>>,
        refuse: bool,
    }

    #[async_trait]
    impl UrlIssuer for RecordingIssuer {
        async fn issue(&self, request: &PresignRequest) -> Result<PresignedUrl, SigningError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.refuse {
                return Err(SigningError::Provider("AccessDenied".to_string()));
            }
            let issued_at = Utc::now();
            Ok(PresignedUrl {
                url: format!("https://{}/{}", request.bucket, request.object_key),
                verb: request.verb,
                issued_at,
                expires_at: issued_at + chrono::Duration::from_std(request.expires_in).unwrap(),
            })
        }
    }

    #[tokio::test]
    async fn test_upload_parameters() {
        let issuer = Arc::new(RecordingIssuer::default());
        let urls = VideoUrls::new(issuer.clone(), "uploads");

        let url = urls.upload_url("demo.mp4").await.unwrap();
        assert_eq!(url.verb, Verb::Put);

        let requests = issuer.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            PresignRequest {
                bucket: "uploads".to_string(),
                object_key: "demo.mp4".to_string(),
                verb: Verb::Put,
                content_type: Some("video/mp4".to_string()),
                expires_in: Duration::from_secs(21_600),
            }
        );
    }

    #[tokio::test]
    async fn test_from_config() {
        let issuer = Arc::new(RecordingIssuer::default());
        let config = BucketConfig {
            name: "videos".to_string(),
            url_ttl_hours: 1,
            upload_content_type: None,
            ..BucketConfig::default()
        };
        let urls = VideoUrls::from_config(issuer.clone(), &config);
        assert_eq!(urls.bucket(), "videos");
        assert_eq!(urls.ttl(), Duration::from_secs(3600));

        urls.upload_url("demo.mp4").await.unwrap();
        assert_eq!(issuer.requests.lock().unwrap()[0].content_type, None);
    }

    #[tokio::test]
    async fn test_download_has_no_content_type() {
        let issuer = Arc::new(RecordingIssuer::default());
        let urls = VideoUrls::new(issuer.clone(), "uploads");

        urls.download_url("demo.mp4").await.unwrap();

        let requests = issuer.requests.lock().unwrap();
        assert_eq!(requests[0].verb, Verb::Get);
        assert_eq!(requests[0].content_type, None);
    }

    #[tokio::test]
    async fn test_refusal_is_an_error_not_a_url() {
        let issuer = Arc::new(RecordingIssuer {
            refuse: true,
            ..Default::default()
        });
        let urls = VideoUrls::new(issuer, "uploads");

        assert!(matches!(
            urls.upload_url("demo.mp4").await,
            Err(SigningError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_key_not_signed() {
        let issuer = Arc::new(RecordingIssuer::default());
        let urls = VideoUrls::new(issuer.clone(), "uploads");

        assert!(matches!(
            urls.download_url("").await,
            Err(SigningError::InvalidObjectKey(_))
        ));
        assert!(matches!(
            urls.download_url("bad\u{0}key").await,
            Err(SigningError::InvalidObjectKey(_))
        ));
        assert!(issuer.requests.lock().unwrap().is_empty());
    }
}
