//! Reeltag REST API
//!
//! HTTP API layer for Reeltag, built with Axum.
//!
//! # Endpoints
//!
//! ## Labels
//! - `GET /api/labels` - Distinct labels across the table
//! - `GET /api/labels/:label` - Object keys tagged with a label
//!
//! ## Videos
//! - `PUT /api/videos/:key` - Presigned upload URL
//! - `GET /api/videos/:key` - Presigned download URL
//!
//! ## Meta
//! - `GET /` - Welcome banner
//! - `GET /api/version` - Service version
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use reeltag::api::{serve, AppState};
//! use reeltag::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default();
//!     let state = AppState::from_config(&config).await?;
//!     serve(state, &config.api).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/labels", get(routes::labels::list_labels))
        .route("/labels/:label", get(routes::labels::list_objects))
        .route(
            "/videos/:key",
            put(routes::videos::upload_url).get(routes::videos::download_url),
        )
        .route("/version", get(routes::meta::version));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::meta::welcome))
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Reeltag API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Reeltag API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::index::FailurePolicy;
    use crate::presign::{PresignRequest, PresignedUrl, SigningError, UrlIssuer};
    use crate::store::{IndexRecord, MemoryTable};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use tower::util::ServiceExt;

    /// Issues deterministic URLs without credentials
    struct FakeIssuer;

    #[async_trait]
    impl UrlIssuer for FakeIssuer {
        async fn issue(&self, request: &PresignRequest) -> Result<PresignedUrl, SigningError> {
            let issued_at = Utc::now();
            let ttl = chrono::Duration::from_std(request.expires_in)
                .map_err(|e| SigningError::InvalidExpiry(e.to_string()))?;
            Ok(PresignedUrl {
                url: format!(
                    "https://{}.s3.amazonaws.com/{}?verb={}",
                    request.bucket, request.object_key, request.verb
                ),
                verb: request.verb,
                issued_at,
                expires_at: issued_at + ttl,
            })
        }
    }

    fn test_config(policy: FailurePolicy) -> Config {
        let mut config = Config::default();
        config.bucket.name = "reeltag-uploads".to_string();
        config.index.on_store_failure = policy;
        config
    }

    fn create_test_app(policy: FailurePolicy) -> (Router, Arc<MemoryTable>) {
        let table = Arc::new(MemoryTable::with_page_size(1));
        table.put_all(vec![
            IndexRecord::label_association("cats", "cat1.mp4"),
            IndexRecord::label_association("dogs", "dog1.mp4"),
            IndexRecord::label_association("cats", "cat2.mp4"),
        ]);
        let state = AppState::new(table.clone(), Arc::new(FakeIssuer), &test_config(policy));
        (build_router(state), table)
    }

    async fn send(app: Router, method: &str, uri: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app, "GET", "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_follows_store() {
        let (app, table) = create_test_app(FailurePolicy::Propagate);
        let response = send(app.clone(), "GET", "/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);

        table.fail_after(0);
        let response = send(app, "GET", "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app, "GET", "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "memory");
    }

    #[tokio::test]
    async fn test_welcome_and_version() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app.clone(), "GET", "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(app, "GET", "/api/version").await;
        let body = json_body(response).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_list_labels() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app, "GET", "/api/labels").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!(["cats", "dogs"]));
    }

    #[tokio::test]
    async fn test_list_objects() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app.clone(), "GET", "/api/labels/cats").await;
        assert_eq!(
            json_body(response).await,
            serde_json::json!(["cat1.mp4", "cat2.mp4"])
        );

        let response = send(app, "GET", "/api/labels/birds").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_invalid_label_is_bad_request() {
        let (app, table) = create_test_app(FailurePolicy::Propagate);
        let response = send(app, "GET", "/api/labels/cats%23x").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());
        assert_eq!(table.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (app, table) = create_test_app(FailurePolicy::Propagate);
        table.fail_after(1);

        let response = send(app, "GET", "/api/labels").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"]["code"], "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_store_failure_degrades() {
        let (app, table) = create_test_app(FailurePolicy::Degrade);
        table.fail_after(1);

        let response = send(app, "GET", "/api/labels").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[dto::PARTIAL_RESULT_HEADER], "true");
        assert_eq!(json_body(response).await, serde_json::json!(["cats"]));
    }

    #[tokio::test]
    async fn test_upload_url() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let before = Utc::now();
        let response = send(app, "PUT", "/api/videos/demo.mp4").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["bucketName"], "reeltag-uploads");
        assert_eq!(body["fileName"], "demo.mp4");
        assert!(body["url"].as_str().unwrap().contains("verb=PUT"));

        let expires_at: chrono::DateTime<Utc> =
            serde_json::from_value(body["expiresAt"].clone()).unwrap();
        let drift = (expires_at - (before + chrono::Duration::hours(6)))
            .num_seconds()
            .abs();
        assert!(drift <= 5);
    }

    #[tokio::test]
    async fn test_download_url() {
        let (app, _) = create_test_app(FailurePolicy::Propagate);
        let response = send(app, "GET", "/api/videos/demo.mp4").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["url"].as_str().unwrap().contains("verb=GET"));
    }
}
