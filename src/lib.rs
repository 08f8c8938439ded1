//! # Finance Complaint Ingest Library
//!
//! Incremental, resumable ingestion of date-partitioned records from a remote
//! HTTP source into a local dataset. Built for the consumer complaint search
//! API, usable with any source that answers a date-range GET with a JSON array.
//!
//! ## Features
//!
//! - **Adaptive Interval Planning**: Yearly, monthly, weekly or single-interval splits
//!   chosen from the span of the requested range
//! - **Bounded Retries**: Every interval gets a fixed retry budget; server wait hints
//!   found in failing bodies are honored, exponential backoff otherwise
//! - **All-or-Nothing Raw Files**: A failing attempt never leaves a partial file
//! - **Compaction**: Per-interval raw files are merged into one JSON Lines dataset,
//!   optionally deduplicated on a record key
//! - **Resume Capability**: A YAML checkpoint lets the next run start where this one stopped
//!
//! ## Quick Start
//!
//! ```no_run
//! use finance_complaint_ingest::config::IngestionConfig;
//! use finance_complaint_ingest::fetcher::HttpSource;
//! use finance_complaint_ingest::pipeline::RunController;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IngestionConfig::default();
//! let source = Arc::new(HttpSource::with_timeout(config.request_timeout())?);
//! let controller = RunController::new(config, source);
//!
//! let artifact = controller
//!     .run(NaiveDate::from_ymd_opt(2011, 12, 1), NaiveDate::from_ymd_opt(2012, 6, 1))
//!     .await?;
//! println!("{} records in {}", artifact.records_compacted, artifact.dataset_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`planner`] - Date range to fetch intervals
//! - [`fetcher`] - Record sources (HTTP) and response unwrapping
//! - [`downloader`] - Fetch executor with retries, and the interval orchestrator
//! - [`output`] - Raw interval files and the compacted dataset
//! - [`resume`] - Checkpoint persistence
//! - [`pipeline`] - Run controller tying the above together

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Run configuration
pub mod config;

/// Interval fetching and orchestration
pub mod downloader;

/// Record sources
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Raw files and the consolidated dataset
pub mod output;

/// Ingestion runs end to end
pub mod pipeline;

/// Interval planning
pub mod planner;

/// Checkpoint persistence
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

// Re-export commonly used types
pub use config::IngestionConfig;
pub use pipeline::{IngestionArtifact, PipelineError, RunController};
pub use planner::{plan_boundaries, plan_intervals, DateInterval, Granularity};
pub use resume::CheckpointRecord;
