//! S3 presigning through `aws-sdk-s3`

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use std::time::SystemTime;

use super::{PresignRequest, PresignedUrl, SigningError, UrlIssuer, Verb};
use crate::config::BucketConfig;

/// Signs URLs with one long-lived S3 client
#[derive(Clone)]
pub struct S3UrlIssuer {
    client: S3Client,
}

impl S3UrlIssuer {
    /// Build the client from the default AWS provider chain
    pub async fn connect(config: &BucketConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        tracing::debug!(
            bucket = %config.name,
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "S3 client configured"
        );

        Self::from_client(S3Client::from_conf(builder.build()))
    }

    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlIssuer for S3UrlIssuer {
    async fn issue(&self, request: &PresignRequest) -> Result<PresignedUrl, SigningError> {
        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(request.expires_in)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                SigningError::InvalidExpiry(format!("{:?} is out of range", request.expires_in))
            })?;

        let presigning = PresigningConfig::builder()
            .start_time(SystemTime::from(issued_at))
            .expires_in(request.expires_in)
            .build()
            .map_err(|e| SigningError::InvalidExpiry(e.to_string()))?;

        let presigned = match request.verb {
            Verb::Put => {
                let mut put = self
                    .client
                    .put_object()
                    .bucket(&request.bucket)
                    .key(&request.object_key);
                if let Some(content_type) = &request.content_type {
                    put = put.content_type(content_type);
                }
                put.presigned(presigning)
                    .await
                    .map_err(|e| SigningError::Provider(DisplayErrorContext(&e).to_string()))?
            }
            Verb::Get => self
                .client
                .get_object()
                .bucket(&request.bucket)
                .key(&request.object_key)
                .presigned(presigning)
                .await
                .map_err(|e| SigningError::Provider(DisplayErrorContext(&e).to_string()))?,
        };

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            verb: request.verb,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use std::time::Duration;

    fn offline_issuer() -> S3UrlIssuer {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-2"))
            .credentials_provider(Credentials::new(
                "AKIDEXAMPLE",
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                None,
                None,
                "test",
            ))
            .build();
        S3UrlIssuer::from_client(S3Client::from_conf(config))
    }

    fn request(verb: Verb, content_type: Option<&str>) -> PresignRequest {
        PresignRequest {
            bucket: "reeltag-uploads".to_string(),
            object_key: "demo.mp4".to_string(),
            verb,
            content_type: content_type.map(str::to_string),
            expires_in: Duration::from_secs(6 * 60 * 60),
        }
    }

    #[tokio::test]
    async fn test_upload_url_expires_in_six_hours() {
        let issuer = offline_issuer();
        let before = Utc::now();

        let url = issuer
            .issue(&request(Verb::Put, Some("video/mp4")))
            .await
            .unwrap();

        assert!(!url.url.is_empty());
        assert!(url.url.contains("reeltag-uploads"));
        assert!(url.url.contains("demo.mp4"));
        assert!(url.url.contains("X-Amz-Expires=21600"));
        assert!(url.url.contains("X-Amz-Signature="));

        let expected = before + chrono::Duration::hours(6);
        let drift = (url.expires_at - expected).num_seconds().abs();
        assert!(drift <= 5, "expiry drifted by {}s", drift);
    }

    #[tokio::test]
    async fn test_download_url() {
        let issuer = offline_issuer();
        let url = issuer.issue(&request(Verb::Get, None)).await.unwrap();

        assert_eq!(url.verb, Verb::Get);
        assert!(url.url.starts_with("https://"));
        assert!(url.url.contains("X-Amz-Expires=21600"));
    }

    #[tokio::test]
    async fn test_expiry_beyond_provider_limit() {
        let issuer = offline_issuer();
        let mut req = request(Verb::Get, None);
        req.expires_in = Duration::from_secs(8 * 24 * 60 * 60);

        assert!(matches!(
            issuer.issue(&req).await,
            Err(SigningError::InvalidExpiry(_))
        ));
    }
}
