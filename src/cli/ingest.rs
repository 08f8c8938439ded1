//! Ingest command implementation

use super::{parse_concurrency, Cli, CliError, OutputFormat};
use crate::config::IngestionConfig;
use crate::downloader::config::MAX_RETRIES_LIMIT;
use crate::fetcher::HttpSource;
use crate::pipeline::{IngestionArtifact, RunController};
use crate::shutdown::SharedShutdown;
use chrono::NaiveDate;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

/// Ingest command arguments
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Start date (YYYY-MM-DD); ignored when a checkpoint exists
    #[arg(long)]
    pub from_date: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), defaults to today (UTC)
    #[arg(long)]
    pub to_date: Option<NaiveDate>,

    /// Retries per interval (range: 0-20)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETRIES_LIMIT)))]
    pub max_retries: Option<u32>,

    /// Intervals fetched at once (max: 32)
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Source URL template with <fromdate> and <todate> placeholders
    #[arg(long, env = "INGEST_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Record field used to drop duplicates during compaction
    #[arg(long)]
    pub dedup_key: Option<String>,
}

impl IngestArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut IngestionConfig) {
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(url) = &self.source_url {
            config.source_url = url.clone();
        }
        if let Some(key) = &self.dedup_key {
            config.dedup_key = Some(key.clone());
        }
    }

    /// Execute a run
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let mut config = cli.load_config()?;
        self.apply(&mut config);
        config.validate()?;

        let source = HttpSource::with_timeout(config.request_timeout())?;
        let controller = RunController::new(config, Arc::new(source)).with_shutdown(shutdown);

        info!(from = ?self.from_date, to = ?self.to_date, "Starting ingest command");
        let artifact = controller.run(self.from_date, self.to_date).await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&artifact)?,
            OutputFormat::Human => output_human(&artifact),
        }
        Ok(())
    }
}

fn output_json(artifact: &IngestionArtifact) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(artifact)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize artifact: {e}")))?;
    println!("{json}");
    Ok(())
}

fn output_human(artifact: &IngestionArtifact) {
    if artifact.is_complete() {
        println!("\nIngestion completed successfully!");
    } else {
        println!("\nIngestion finished with failures.");
    }
    println!("Range: {} to {}", artifact.from_date, artifact.to_date);
    println!(
        "Intervals: {} planned, {} written",
        artifact.intervals_planned, artifact.intervals_written
    );
    println!("Records compacted: {}", artifact.records_compacted);
    println!("Dataset: {}", artifact.dataset_path.display());
    println!("Raw files: {}", artifact.raw_dir.display());
    match artifact.checkpoint_to_date {
        Some(date) => println!(
            "Checkpoint: {} (to {})",
            artifact.checkpoint_path.display(),
            date
        ),
        None => println!("Checkpoint: unchanged"),
    }
    if artifact.cancelled > 0 {
        println!("Skipped after shutdown: {}", artifact.cancelled);
    }
    if artifact.failed_count > 0 {
        eprintln!("Failed intervals: {}", artifact.failed_count);
        for failed in &artifact.failed_tasks {
            eprintln!(
                "  {} ({} attempts): {}",
                failed.task.source_url, failed.attempts, failed.last_error
            );
        }
    }
}
