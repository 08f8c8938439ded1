//! Raw interval files and the consolidated dataset
//!
//! - [`path`] - deterministic file naming for raw, diagnostics, and dataset files
//! - [`raw`] - all-or-nothing JSON array files, one per interval
//! - [`compactor`] - merges a run's raw files into the JSON Lines dataset

use std::path::Path;

pub mod compactor;
pub mod path;
pub mod raw;

pub use compactor::{CompactionSummary, Compactor};
pub use path::{dataset_file_name, diagnostics_path, raw_file_name};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// A raw file did not contain a JSON array of records
    #[error("malformed raw file {path}: {reason}")]
    MalformedRawFile {
        /// Offending file
        path: String,
        /// Parser message
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl OutputError {
    pub(crate) fn io(context: &str, path: &Path, err: std::io::Error) -> Self {
        OutputError::IoError(format!("{context} {}: {err}", path.display()))
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
