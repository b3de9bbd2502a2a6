//! Label Routes
//!
//! - GET /api/labels - Distinct labels, ascending
//! - GET /api/labels/:label - Object keys tagged with a label, ascending

use axum::extract::{Path, State};
use std::sync::Arc;

use crate::api::dto::ListingResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/labels
pub async fn list_labels(State(state): State<Arc<AppState>>) -> ApiResult<ListingResponse> {
    let listing = state
        .failure_policy
        .apply(state.labels.list_labels().await)?;
    Ok(ListingResponse(listing))
}

/// GET /api/labels/:label
///
/// An unknown label answers with an empty array.
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> ApiResult<ListingResponse> {
    let listing = state
        .failure_policy
        .apply(state.tags.list_objects(&label).await)?;
    Ok(ListingResponse(listing))
}
