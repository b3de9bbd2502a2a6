//! Data Transfer Objects
//!
//! Response types for the HTTP API. Listings are plain JSON arrays; URL
//! responses use camelCase field names.

use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::index::Listing;
use crate::presign::PresignedUrl;

/// Set on listing responses that were cut short by a store failure
pub const PARTIAL_RESULT_HEADER: HeaderName = HeaderName::from_static("x-partial-result");

// ============================================
// Listing Responses
// ============================================

/// JSON array of strings; flags incomplete listings with a header
#[derive(Debug)]
pub struct ListingResponse(pub Listing);

impl IntoResponse for ListingResponse {
    fn into_response(self) -> Response {
        let complete = self.0.complete;
        let mut response = Json(self.0.into_values()).into_response();
        if !complete {
            response
                .headers_mut()
                .insert(PARTIAL_RESULT_HEADER, HeaderValue::from_static("true"));
        }
        response
    }
}

// ============================================
// Video URL Responses
// ============================================

/// Presigned URL for one video object
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUrlResponse {
    pub url: String,
    pub bucket_name: String,
    pub file_name: String,
    pub expires_at: DateTime<Utc>,
}

impl VideoUrlResponse {
    pub fn new(presigned: PresignedUrl, bucket: &str, file_name: &str) -> Self {
        Self {
            url: presigned.url,
            bucket_name: bucket.to_string(),
            file_name: file_name.to_string(),
            expires_at: presigned.expires_at,
        }
    }
}

// ============================================
// Meta Responses
// ============================================

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or unhealthy
    pub status: String,
    /// Store status: ok or error
    pub store: String,
    /// Store backend name
    pub backend: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
