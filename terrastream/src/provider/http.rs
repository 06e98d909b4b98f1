//! HTTP client abstraction for testability

use super::types::ProviderError;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default idle connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 16;

const DEFAULT_USER_AGENT: &str = concat!("terrastream/", env!("CARGO_PKG_VERSION"));

/// Trait for async HTTP GET operations.
///
/// The scheduler spawns one fetch per in-flight tile, so implementations
/// must be shareable across tasks. Tests substitute in-memory clients.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an async HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body or an error. A non-success status is an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(DEFAULT_POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ProviderError::ClientSetup(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes, ProviderError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(ProviderError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::HttpError(format!("Failed to read response: {}", e)))?;

        trace!(url = url, bytes = body.len(), "HTTP GET complete");
        Ok(body)
    }
}
