//! Service metadata
//!
//! - GET / - Welcome banner
//! - GET /api/version - Crate name and version

use axum::Json;

use crate::api::dto::VersionResponse;

/// GET /
pub async fn welcome() -> &'static str {
    "Welcome to the Reeltag video label API"
}

/// GET /api/version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
