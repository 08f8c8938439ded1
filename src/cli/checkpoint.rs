//! Checkpoint subcommand

use super::{Cli, CliError, OutputFormat};
use crate::pipeline::run::checkpoint_path;
use crate::resume::MetadataStore;
use clap::Parser;

/// Show where ingestion left off
#[derive(Parser, Debug)]
pub struct CheckpointCommand {}

impl CheckpointCommand {
    /// Print the current checkpoint; a missing checkpoint is not an error
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = cli.load_config()?;
        let store = MetadataStore::new(checkpoint_path(&config.artifact_dir));
        let record = store.read()?;

        match cli.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&record).map_err(|e| {
                    CliError::InvalidArgument(format!("Failed to serialize checkpoint: {e}"))
                })?;
                println!("{json}");
            }
            OutputFormat::Human => match record {
                Some(record) => {
                    println!("Checkpoint: {}", store.path().display());
                    println!("  From: {}", record.from_date);
                    println!("  To: {}", record.to_date);
                    println!("  Dataset: {}", record.dataset_path.display());
                }
                None => println!("No checkpoint at {}", store.path().display()),
            },
        }
        Ok(())
    }
}
