//! CLI command implementations

use crate::config::IngestionConfig;
use crate::downloader::config::MAX_CONCURRENCY;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub mod checkpoint;
pub mod error;
pub mod ingest;

pub use checkpoint::CheckpointCommand;
pub use error::CliError;
pub use ingest::IngestArgs;

/// Parse and validate concurrency value
pub(crate) fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Finance complaint ingestion CLI
#[derive(Parser, Debug)]
#[command(name = "finance-complaint-ingest")]
#[command(about = "Incrementally ingest consumer complaint records into a local dataset", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(long, global = true, env = "INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Artifact root directory (overrides the config file)
    #[arg(long, global = true, env = "INGEST_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true, env = "INGEST_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Configuration from `--config` (or defaults) with global overrides applied
    pub fn load_config(&self) -> Result<IngestionConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration");
                IngestionConfig::from_yaml_file(path)?
            }
            None => IngestionConfig::default(),
        };
        if let Some(dir) = &self.artifact_dir {
            config.artifact_dir = dir.clone();
        }
        Ok(config)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, compact and checkpoint a date range
    Ingest(IngestArgs),

    /// Show the current checkpoint
    Checkpoint(CheckpointCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
