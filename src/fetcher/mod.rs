//! Record sources
//!
//! The ingestion engine only needs one operation from the remote side: a GET
//! that yields a status and a body. [`RecordSource`] captures that so the
//! fetch executor can run against [`http::HttpSource`] in production and
//! scripted sources in tests.

use async_trait::async_trait;

pub mod http;
pub mod parser;
pub mod retry_formatter;

pub use http::HttpSource;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Body could not be read
    #[error("failed to read response body: {0}")]
    BodyError(String),

    /// Response body could not be interpreted
    #[error("parse error: {0}")]
    ParseError(String),

    /// Client could not be built
    #[error("HTTP client error: {0}")]
    ClientError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Raw response from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    /// HTTP status code
    pub status: u16,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
}

impl SourceResponse {
    /// Successful response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Response with an explicit status
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A remote endpoint returning JSON record pages
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Issue a GET against a fully substituted URL
    async fn get(&self, url: &str) -> FetcherResult<SourceResponse>;
}
