//! Reeltag CLI
//!
//! Command-line interface for Reeltag operations:
//! - Serve the HTTP API
//! - List labels and the videos tagged with them
//! - Issue presigned upload/download URLs
//! - Seed a local SQLite table from CSV

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use reeltag::api::{serve, AppState};
use reeltag::config::{generate_default_config, Config};
use reeltag::index::{LabelEnumerator, Listing, TagIndexReader};
use reeltag::presign::{PresignedUrl, S3UrlIssuer, VideoUrls};
use reeltag::seed::SeedImporter;
use reeltag::store::{self, SqliteTable};

#[derive(Parser)]
#[command(name = "reeltag")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Video label index and presigned upload URLs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve,

    /// List distinct labels
    Labels,

    /// List videos tagged with a label
    Objects {
        /// Label to look up
        label: String,
    },

    /// Issue a presigned upload URL
    UploadUrl {
        /// Object key, e.g. demo.mp4
        key: String,
    },

    /// Issue a presigned download URL
    DownloadUrl {
        /// Object key, e.g. demo.mp4
        key: String,
    },

    /// Load label,object_key rows from CSV into the SQLite table
    Seed {
        /// CSV file
        file: PathBuf,
        /// The file has no header row
        #[arg(long)]
        no_header: bool,
    },

    /// Print a default configuration file
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_default(),
    };
    reeltag::logging::init(&config.logging).context("installing log subscriber")?;

    match cli.command {
        Commands::Serve => {
            config.validate()?;
            let state = AppState::from_config(&config).await?;
            serve(state, &config.api).await?;
        }
        Commands::Labels => {
            let store = store::open(&config.store).await?;
            let labels = LabelEnumerator::new(store, config.read_options());
            let listing = config
                .index
                .on_store_failure
                .apply(labels.list_labels().await)?;
            print_listing(&listing, &cli.format)?;
        }
        Commands::Objects { label } => {
            let store = store::open(&config.store).await?;
            let tags = TagIndexReader::new(store, config.read_options());
            let listing = config
                .index
                .on_store_failure
                .apply(tags.list_objects(&label).await)?;
            print_listing(&listing, &cli.format)?;
        }
        Commands::UploadUrl { key } => {
            config.validate()?;
            let url = video_urls(&config).await.upload_url(&key).await?;
            print_url(&url, &cli.format)?;
        }
        Commands::DownloadUrl { key } => {
            config.validate()?;
            let url = video_urls(&config).await.download_url(&key).await?;
            print_url(&url, &cli.format)?;
        }
        Commands::Seed { file, no_header } => {
            let result = SeedImporter::new()
                .with_header(!no_header)
                .import(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            for error in &result.errors {
                eprintln!("{}", error);
            }

            let table = SqliteTable::open(&config.store.sqlite_path)?;
            let written = table.put_all(&result.records)?;
            println!(
                "Seeded {} rows into {} ({} skipped)",
                written,
                config.store.sqlite_path.display(),
                result.rows_failed
            );
        }
        // Printed before any config was loaded
        Commands::Config => {}
    }

    Ok(())
}

async fn video_urls(config: &Config) -> VideoUrls {
    let issuer = Arc::new(S3UrlIssuer::connect(&config.bucket).await);
    VideoUrls::from_config(issuer, &config.bucket)
}

fn print_listing(listing: &Listing, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&listing.values)?);
    } else {
        for value in &listing.values {
            println!("{}", value);
        }
    }
    if !listing.complete {
        eprintln!("warning: store failed mid-listing, results are partial");
    }
    Ok(())
}

fn print_url(url: &PresignedUrl, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(url)?);
    } else {
        println!("{}", url.url);
        eprintln!("{} until {}", url.verb, url.expires_at);
    }
    Ok(())
}
