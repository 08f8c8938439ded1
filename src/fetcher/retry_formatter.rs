//! Retry message formatting for interval fetches.
//!
//! Keeps the retry log lines consistent ("attempt X/Y", wait time, interval)
//! and produces an operator-facing summary when an interval gives up.

use super::FetcherError;
use crate::planner::DateInterval;
use std::time::Duration;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request timed out
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 or a throttling body
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Other non-2xx status
    ClientError(u16),
    /// Body was not the expected JSON array
    MalformedResponse,
    /// Raw file could not be written
    Filesystem,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify a transport failure
    pub fn from_fetcher_error(err: &FetcherError) -> Self {
        match err {
            FetcherError::Timeout(_) => Self::NetworkTimeout,
            FetcherError::Connect(_) => Self::NetworkOffline,
            _ => Self::NetworkGeneric,
        }
    }

    /// Classify a non-2xx status
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            500..=599 => Self::ServerError(status),
            _ => Self::ClientError(status),
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                403 => "request forbidden",
                404 => "resource not found",
                _ => "client error",
            },
            Self::MalformedResponse => "malformed response",
            Self::Filesystem => "write failure",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation presented after an interval gives up.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise --request-timeout-secs",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Lower --concurrency or rerun later; the checkpoint keeps progress",
            Self::ServerError(_) => "The data source may be degraded, try again later",
            Self::ClientError(_) => "Check the source URL template and its date placeholders",
            Self::MalformedResponse => "Inspect the archived response in the failed downloads directory",
            Self::Filesystem => "Check free disk space and permissions of the artifact directory",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Maximum number of attempts for the task
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// Interval being fetched
    pub interval: Option<DateInterval>,
    /// Original error message for details
    pub error_message: String,
    /// URL that failed
    pub url: String,
}

impl RetryContext {
    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_interval(&mut message, self.interval);
        message
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "[FAILED] Interval download failed after {} attempts",
            self.attempt
        ));
        lines.push(format!("  Last error: {}", self.error_message));

        let range_display = self
            .interval
            .map(|interval| format!("{} to {}", interval.start, interval.end))
            .unwrap_or_else(|| "unknown".to_string());
        lines.push(format!("  Date range: {range_display}"));
        lines.push(format!("  URL: {}", self.url));
        lines.push("  Suggestions:".to_string());
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ),
        ]
    }
}

fn append_interval(buffer: &mut String, interval: Option<DateInterval>) {
    if let Some(interval) = interval {
        buffer.push_str(&format!(" ({} to {})", interval.start, interval.end));
    }
}
