//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `REELTAG_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::index::{DedupStrategy, FailurePolicy, ReadOptions};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub bucket: BucketConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl ApiConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which table backend serves reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    DynamoDb,
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Label table configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint, e.g. DynamoDB Local
    pub endpoint_url: Option<String>,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    /// Rows requested per page; backend default when unset
    pub page_size: Option<u32>,

    #[serde(default = "default_partition_key_attr")]
    pub partition_key_attr: String,

    #[serde(default = "default_sort_key_attr")]
    pub sort_key_attr: String,

    #[serde(default = "default_label_attr")]
    pub label_attr: String,

    #[serde(default = "default_object_key_attr")]
    pub object_key_attr: String,
}

fn default_table_name() -> String {
    "AWSomeRekognitionTB".to_string()
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("reeltag").join("labels.db"))
        .unwrap_or_else(|| PathBuf::from("./reeltag_data/labels.db"))
}

fn default_partition_key_attr() -> String {
    "PK".to_string()
}

fn default_sort_key_attr() -> String {
    "SK".to_string()
}

fn default_label_attr() -> String {
    "Label".to_string()
}

fn default_object_key_attr() -> String {
    "ObjectKey".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table_name: default_table_name(),
            region: default_region(),
            endpoint_url: None,
            sqlite_path: default_sqlite_path(),
            page_size: None,
            partition_key_attr: default_partition_key_attr(),
            sort_key_attr: default_sort_key_attr(),
            label_attr: default_label_attr(),
            object_key_attr: default_object_key_attr(),
        }
    }
}

/// Object storage bucket for video uploads
#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    /// Bucket name; required to serve URLs
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_region")]
    pub region: String,

    pub endpoint_url: Option<String>,

    #[serde(default = "default_url_ttl_hours")]
    pub url_ttl_hours: u64,

    #[serde(default = "default_upload_content_type")]
    pub upload_content_type: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,
}

fn default_url_ttl_hours() -> u64 {
    6
}

fn default_upload_content_type() -> Option<String> {
    Some(crate::presign::DEFAULT_UPLOAD_CONTENT_TYPE.to_string())
}

impl BucketConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_hours * 60 * 60)
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            region: default_region(),
            endpoint_url: None,
            url_ttl_hours: default_url_ttl_hours(),
            upload_content_type: default_upload_content_type(),
            force_path_style: false,
        }
    }
}

/// Listing behavior
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub dedup: DedupStrategy,

    #[serde(default)]
    pub on_store_failure: FailurePolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("reeltag").join("config.toml")),
            Some(PathBuf::from("/etc/reeltag/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = var("REELTAG_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("REELTAG_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Store overrides
        if let Some(backend) = var("REELTAG_STORE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!("Ignoring REELTAG_STORE_BACKEND: {}", e),
            }
        }
        if let Some(table) = var("REELTAG_TABLE_NAME") {
            self.store.table_name = table;
        }
        if let Some(region) = var("REELTAG_STORE_REGION") {
            self.store.region = region;
        }
        if let Some(endpoint) = var("REELTAG_STORE_ENDPOINT") {
            self.store.endpoint_url = Some(endpoint);
        }
        if let Some(path) = var("REELTAG_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(path);
        }

        // Bucket overrides
        if let Some(bucket) = var("REELTAG_BUCKET_NAME") {
            self.bucket.name = bucket;
        }
        if let Some(region) = var("REELTAG_BUCKET_REGION") {
            self.bucket.region = region;
        }
        if let Some(endpoint) = var("REELTAG_BUCKET_ENDPOINT") {
            self.bucket.endpoint_url = Some(endpoint);
        }

        // Index overrides
        if let Some(dedup) = var("REELTAG_DEDUP") {
            match dedup.parse() {
                Ok(d) => self.index.dedup = d,
                Err(e) => tracing::warn!("Ignoring REELTAG_DEDUP: {}", e),
            }
        }
        if let Some(policy) = var("REELTAG_ON_STORE_FAILURE") {
            match policy.parse() {
                Ok(p) => self.index.on_store_failure = p,
                Err(e) => tracing::warn!("Ignoring REELTAG_ON_STORE_FAILURE: {}", e),
            }
        }

        // Logging overrides
        if let Some(level) = var("REELTAG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("REELTAG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Options handed to both index readers
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            dedup: self.index.dedup,
            page_size: self.store.page_size,
        }
    }

    /// Check settings that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "bucket.name must be set (or REELTAG_BUCKET_NAME)".to_string(),
            ));
        }
        if self.bucket.url_ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "bucket.url_ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.store.page_size == Some(0) {
            return Err(ConfigError::Invalid(
                "store.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Reeltag Configuration
#
# Environment variables override these settings:
# - REELTAG_API_HOST, REELTAG_API_PORT
# - REELTAG_STORE_BACKEND, REELTAG_TABLE_NAME, REELTAG_STORE_REGION
# - REELTAG_STORE_ENDPOINT, REELTAG_SQLITE_PATH
# - REELTAG_BUCKET_NAME, REELTAG_BUCKET_REGION, REELTAG_BUCKET_ENDPOINT
# - REELTAG_DEDUP, REELTAG_ON_STORE_FAILURE
# - REELTAG_LOG_LEVEL, REELTAG_LOG_FORMAT

[api]
host = "0.0.0.0"
port = 8080

[store]
# Backend: dynamodb, sqlite or memory
backend = "dynamodb"

table_name = "AWSomeRekognitionTB"
region = "us-east-2"

# Point at DynamoDB Local or another compatible endpoint
# endpoint_url = "http://localhost:8000"

# Used when backend = "sqlite" (fill it with `reeltag seed labels.csv`)
# sqlite_path = "~/.local/share/reeltag/labels.db"

# Rows per page; omit for the backend default
# page_size = 100

# Attribute names on the table
partition_key_attr = "PK"
sort_key_attr = "SK"
label_attr = "Label"
object_key_attr = "ObjectKey"

[bucket]
# Bucket that receives uploaded videos (required)
name = ""
region = "us-east-2"

# Lifetime of presigned URLs
url_ttl_hours = 6

# Content type uploads must be sent with
upload_content_type = "video/mp4"

# endpoint_url = "http://localhost:9000"
# force_path_style = true

[index]
# Duplicate removal: set (global) or adjacent (legacy, consecutive only)
dedup = "set"

# On store failure: propagate (HTTP 503) or degrade (partial list, HTTP 200)
on_store_failure = "propagate"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
