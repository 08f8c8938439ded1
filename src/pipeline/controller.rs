//! Top-level run controller

use super::run::{checkpoint_path, new_run_id, IngestionRun};
use super::{IngestionArtifact, PipelineError};
use crate::config::IngestionConfig;
use crate::downloader::{
    FetchExecutor, IngestionOrchestrator, IntervalRequest, OrchestrationReport,
};
use crate::fetcher::RecordSource;
use crate::metrics::RunMetrics;
use crate::output::Compactor;
use crate::resume::{CheckpointRecord, MetadataStore};
use crate::shutdown::{self, SharedShutdown};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs ingestion for one date range and advances the checkpoint
pub struct RunController {
    config: IngestionConfig,
    source: Arc<dyn RecordSource>,
    shutdown: Option<SharedShutdown>,
    run_id: Option<String>,
}

impl RunController {
    /// Controller over `source`, picking up the global shutdown handle if registered
    pub fn new(config: IngestionConfig, source: Arc<dyn RecordSource>) -> Self {
        Self {
            config,
            source,
            shutdown: shutdown::get_global_shutdown(),
            run_id: None,
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fix the run identifier instead of deriving it from the clock
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    fn store(&self) -> MetadataStore {
        MetadataStore::new(checkpoint_path(&self.config.artifact_dir))
    }

    /// Current checkpoint, `None` before the first successful run
    pub fn last_checkpoint(&self) -> Result<Option<CheckpointRecord>, PipelineError> {
        Ok(self.store().read()?)
    }

    /// Ingest `[from, to]` (both optional, see [`IngestionRun::resolve`])
    pub async fn run(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<IngestionArtifact, PipelineError> {
        let run_id = self.run_id.clone().unwrap_or_else(new_run_id);
        let metrics = RunMetrics::start(run_id.clone());

        match self.run_inner(run_id, from, to).await {
            Ok(artifact) => {
                metrics.record_success(artifact.failed_count + artifact.cancelled);
                Ok(artifact)
            }
            Err(e) => {
                metrics.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        run_id: String,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<IngestionArtifact, PipelineError> {
        // RESOLVE_RANGE
        self.config.validate()?;
        let store = self.store();
        let checkpoint = store.read()?;
        let run = IngestionRun::resolve(&self.config, from, to, checkpoint.as_ref(), run_id)?;

        info!(
            run_id = %run.run_id,
            from = %run.from_date,
            to = %run.to_date,
            resumed = checkpoint.is_some(),
            "Starting data ingestion"
        );

        // FETCH
        let fetched = !run.is_noop();
        let report = if fetched {
            self.fetch(&run).await?
        } else {
            info!(date = %run.from_date, "Range is a single day, skipping fetch");
            OrchestrationReport {
                completed_through: Some(run.to_date),
                ..OrchestrationReport::default()
            }
        };

        // COMPACT
        let mut records_compacted = 0;
        let mut checkpoint_to_date = None;
        if run.staging_dir.exists() {
            let compactor = Compactor::new().with_dedup_key(self.config.dedup_key.clone());
            // Files past the checkpoint stay staged; the next run fetches them again
            let summary = if fetched {
                let files = report.checkpointed_paths();
                let held_back = report.written.len() - files.len();
                if held_back > 0 {
                    info!(
                        held_back,
                        "Raw files after the first gap are not compacted this run"
                    );
                }
                compactor.compact_files(&files, &run.output_dataset_path)?
            } else {
                compactor.compact(&run.staging_dir, &run.output_dataset_path)?
            };
            records_compacted = summary.records_appended;

            // CHECKPOINT
            let completed_through = report.completed_through.unwrap_or(run.from_date);
            let advances = checkpoint
                .as_ref()
                .map_or(true, |previous| completed_through > previous.to_date);
            if advances {
                let record = CheckpointRecord::new(
                    run.from_date,
                    completed_through,
                    run.output_dataset_path.clone(),
                );
                store.write(&record)?;
                checkpoint_to_date = Some(completed_through);
            }
            if completed_through < run.to_date {
                warn!(
                    completed_through = %completed_through,
                    to = %run.to_date,
                    "Checkpoint stops before the requested end; the rest is retried next run"
                );
            }
        } else {
            info!(staging = %run.staging_dir.display(), "No staging directory, checkpoint unchanged");
        }

        let artifact = IngestionArtifact {
            run_id: run.run_id.clone(),
            dataset_path: run.output_dataset_path.clone(),
            raw_dir: run.staging_dir.clone(),
            checkpoint_path: run.checkpoint_path.clone(),
            from_date: run.from_date,
            to_date: run.to_date,
            intervals_planned: report.intervals_planned,
            intervals_written: report.written.len(),
            failed_count: report.failed_tasks.len(),
            cancelled: report.cancelled.len(),
            failed_tasks: report.failed_tasks,
            records_compacted,
            checkpoint_to_date,
        };

        info!(
            run_id = %artifact.run_id,
            dataset = %artifact.dataset_path.display(),
            records = artifact.records_compacted,
            failed = artifact.failed_count,
            "Data ingestion finished"
        );
        Ok(artifact)
    }

    async fn fetch(&self, run: &IngestionRun) -> Result<OrchestrationReport, PipelineError> {
        let executor = FetchExecutor::new(self.source.clone(), run.failed_dir.clone())
            .with_envelope_field(self.config.envelope_field.clone())
            .with_retry_policy(self.config.retry_policy());

        let mut orchestrator =
            IngestionOrchestrator::new(executor).with_concurrency(self.config.concurrency);
        if let Some(shutdown) = &self.shutdown {
            orchestrator = orchestrator.with_shutdown(shutdown.clone());
        }

        let request = IntervalRequest {
            from_date: run.from_date,
            to_date: run.to_date,
            url_template: self.config.source_url.clone(),
            raw_dir: run.staging_dir.clone(),
            file_name: self.config.file_name.clone(),
            retries: self.config.max_retries,
        };
        Ok(orchestrator.run(&request).await?)
    }
}
