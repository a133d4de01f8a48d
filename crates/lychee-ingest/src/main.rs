//! Lychee Ingest CLI - imports photos into a Lychee-style gallery.
//!
//! RAW, HEIC and PSD uploads are converted to JPEG and the untouched upload is
//! kept as a RAW size variant. Every imported photo gets its ORIGINAL plus
//! derived size variants in the storage root, and a record in the catalog.
//!
//! # Usage
//!
//! ```bash
//! # Import a single photo
//! lychee-ingest import IMG_0042.heic
//!
//! # Import a directory into an album, four at a time
//! lychee-ingest import ./photos/ --album holidays --parallel 4 --output report.jsonl
//!
//! # Export the RAW of an imported photo
//! lychee-ingest photos export <ID> --variant raw --output IMG_0042.heic
//!
//! # View configuration
//! lychee-ingest config show
//! ```

use clap::{Parser, Subcommand};
use lychee_ingest_core::Config;
use std::path::PathBuf;

mod cli;
mod logging;

/// Lychee Ingest - photo ingestion pipeline with RAW preservation.
#[derive(Parser, Debug)]
#[command(name = "lychee-ingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "LYCHEE_INGEST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Import photos from files or directories
    Import(cli::import::ImportArgs),

    /// List, inspect, delete and export imported photos
    Photos(cli::photos::PhotosArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `lychee-ingest config path`."
                );
                Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lychee Ingest v{}", lychee_ingest_core::VERSION);

    match cli.command {
        Commands::Import(args) => cli::import::execute(args, config).await,
        Commands::Photos(args) => cli::photos::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
