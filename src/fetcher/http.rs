//! HTTP record source backed by reqwest

use super::{FetcherError, FetcherResult, RecordSource, SourceResponse};
use crate::downloader::config::REQUEST_TIMEOUT_SECS;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP source shared by every fetch of a run
///
/// Status handling is left to the caller: non-2xx responses are returned
/// as values so their bodies can feed rate-limit hints and diagnostics.
#[derive(Clone)]
pub struct HttpSource {
    client: Arc<Client>,
}

impl HttpSource {
    /// Build a source with the default request timeout
    pub fn new() -> FetcherResult<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Build a source with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetcherError::ClientError(e.to_string()))?;
        Ok(Self::from_client(Arc::new(client)))
    }

    /// Wrap an existing shared client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }
}

fn classify(err: reqwest::Error) -> FetcherError {
    if err.is_timeout() {
        FetcherError::Timeout(err.to_string())
    } else if err.is_connect() {
        FetcherError::Connect(err.to_string())
    } else {
        FetcherError::NetworkError(err.to_string())
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn get(&self, url: &str) -> FetcherResult<SourceResponse> {
        debug!(url = %url, "Sending GET request");

        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetcherError::BodyError(e.to_string()))?;

        debug!(url = %url, status, bytes = bytes.len(), "Received response");

        Ok(SourceResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
