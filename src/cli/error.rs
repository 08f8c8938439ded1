//! CLI error types and conversions

use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::pipeline::PipelineError;
use crate::resume::ResumeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Run-level pipeline failure
    #[error("ingestion failed: {0}")]
    PipelineError(#[from] PipelineError),

    /// HTTP client could not be built
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Resume error
    #[error("checkpoint error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
