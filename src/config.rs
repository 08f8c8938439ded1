//! Run configuration
//!
//! [`IngestionConfig`] is loaded from an optional YAML file and then
//! overridden field by field from the command line. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use crate::downloader::config::{
    DEFAULT_CONCURRENCY, HINT_PADDING_SECS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_CONCURRENCY,
    MAX_HINT_WAIT_SECS, MAX_RETRIES, MAX_RETRIES_LIMIT, REQUEST_TIMEOUT_SECS, RETRY_DEADLINE_SECS,
};
use crate::downloader::orchestrator::{FROM_DATE_PLACEHOLDER, TO_DATE_PLACEHOLDER};
use crate::downloader::RetryPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default consumer complaint search endpoint
pub const DEFAULT_SOURCE_URL: &str = "https://www.consumerfinance.gov/data-research/consumer-complaints/search/api/v1/?date_received_max=<todate>&date_received_min=<fromdate>&field=all&format=json";

/// Default dataset name
pub const DEFAULT_FILE_NAME: &str = "finance_complaint";

/// Default artifact root
pub const DEFAULT_ARTIFACT_DIR: &str = "finance_artifact";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {reason}")]
    Read {
        /// Config file
        path: String,
        /// IO message
        reason: String,
    },

    /// Config file is not valid YAML for this schema
    #[error("failed to parse config {path}: {reason}")]
    Parse {
        /// Config file
        path: String,
        /// Parser message
        reason: String,
    },

    /// A value is out of range or inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for ingestion runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestionConfig {
    /// Root of every artifact the pipeline writes
    pub artifact_dir: PathBuf,
    /// Source URL template with `<fromdate>` and `<todate>` placeholders
    pub source_url: String,
    /// Envelope field holding each record's payload; `None` keeps records whole
    pub envelope_field: Option<String>,
    /// Dataset name
    pub file_name: String,
    /// Earliest date ever requested
    pub min_start_date: NaiveDate,
    /// Retry budget per interval
    pub max_retries: u32,
    /// Intervals fetched at once
    pub concurrency: usize,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// First exponential delay without a hint
    pub initial_backoff_ms: u64,
    /// Cap on exponential delays
    pub max_backoff_ms: u64,
    /// Padding added to hinted waits
    pub hint_padding_secs: u64,
    /// Cap on hinted waits
    pub max_hint_wait_secs: u64,
    /// Total wait budget per interval, 0 disables it
    pub retry_deadline_secs: u64,
    /// Record field used to drop duplicates during compaction
    pub dedup_key: Option<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            envelope_field: Some(crate::downloader::executor::DEFAULT_ENVELOPE_FIELD.to_string()),
            file_name: DEFAULT_FILE_NAME.to_string(),
            min_start_date: NaiveDate::from_ymd_opt(2011, 12, 1).unwrap_or(NaiveDate::MIN),
            max_retries: MAX_RETRIES,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            hint_padding_secs: HINT_PADDING_SECS,
            max_hint_wait_secs: MAX_HINT_WAIT_SECS,
            retry_deadline_secs: RETRY_DEADLINE_SECS,
            dedup_key: None,
        }
    }
}

impl IngestionConfig {
    /// Load and validate a YAML config file
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as a mapping
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: "<inline>".to_string(),
                reason: e.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "concurrency {} exceeds maximum {MAX_CONCURRENCY}",
                self.concurrency
            )));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_retries {} exceeds maximum {MAX_RETRIES_LIMIT}",
                self.max_retries
            )));
        }
        for placeholder in [FROM_DATE_PLACEHOLDER, TO_DATE_PLACEHOLDER] {
            if !self.source_url.contains(placeholder) {
                return Err(ConfigError::Invalid(format!(
                    "source_url must contain the {placeholder} placeholder"
                )));
            }
        }
        if self.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("file_name must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "initial_backoff_ms {} exceeds max_backoff_ms {}",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Retry delays for the fetch executor
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            hint_padding: Duration::from_secs(self.hint_padding_secs),
            max_hint_wait: Duration::from_secs(self.max_hint_wait_secs),
            retry_deadline: (self.retry_deadline_secs > 0)
                .then(|| Duration::from_secs(self.retry_deadline_secs)),
        }
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
