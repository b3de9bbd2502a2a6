//! Reeltag API Server
//!
//! Run with: cargo run --bin reeltag-api
//!
//! # Configuration
//!
//! Reads the first config file found in `$XDG_CONFIG_HOME/reeltag/config.toml`,
//! `/etc/reeltag/config.toml` or `./config.toml`, or `REELTAG_CONFIG` when set.
//! Environment variables override file values:
//! - `REELTAG_API_HOST`, `REELTAG_API_PORT`: bind address (default: 0.0.0.0:8080)
//! - `REELTAG_STORE_BACKEND`: dynamodb, sqlite or memory (default: dynamodb)
//! - `REELTAG_TABLE_NAME`: label table (default: AWSomeRekognitionTB)
//! - `REELTAG_BUCKET_NAME`: upload bucket (required)
//! - `REELTAG_ON_STORE_FAILURE`: propagate or degrade (default: propagate)
//! - `RUST_LOG`: log filter, wins over `logging.level`

use reeltag::api::{serve, AppState};
use reeltag::config::Config;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("REELTAG_CONFIG") {
        Ok(path) => Config::load_with_env(&PathBuf::from(path))?,
        Err(_) => Config::load_default(),
    };

    reeltag::logging::init(&config.logging)?;

    tracing::info!("Starting Reeltag API server v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    tracing::info!(
        backend = ?config.store.backend,
        table = %config.store.table_name,
        bucket = %config.bucket.name,
        dedup = %config.index.dedup,
        on_store_failure = %config.index.on_store_failure,
        "Configuration loaded"
    );

    // Clients are built once and shared by every request
    let state = AppState::from_config(&config).await?;

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state, &config.api).await?;

    tracing::info!("Reeltag API server stopped");
    Ok(())
}
