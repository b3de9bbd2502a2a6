//! Video URL Routes
//!
//! - PUT /api/videos/:key - Presigned upload URL
//! - GET /api/videos/:key - Presigned download URL
//!
//! Neither route touches the object itself; the client talks to the bucket
//! directly with the returned URL.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::VideoUrlResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// PUT /api/videos/:key
pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<VideoUrlResponse>> {
    let presigned = state.videos.upload_url(&key).await?;
    Ok(Json(VideoUrlResponse::new(
        presigned,
        state.videos.bucket(),
        &key,
    )))
}

/// GET /api/videos/:key
pub async fn download_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<VideoUrlResponse>> {
    let presigned = state.videos.download_url(&key).await?;
    Ok(Json(VideoUrlResponse::new(
        presigned,
        state.videos.bucket(),
        &key,
    )))
}
