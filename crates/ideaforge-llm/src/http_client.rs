//! Shared HTTP client for the OpenRouter backend.
//!
//! One `reqwest::Client` per caller, with a bounded per-request timeout and
//! a small retry policy: up to two retries with exponential backoff for 5xx
//! and network failures, none for 4xx.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::LlmError;

/// Hard cap on any single HTTP request (5 minutes).
const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_RETRIES: u32 = 2;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be built.
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .use_rustls_tls()
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Execute a request with the bounded timeout and retry policy.
    ///
    /// The effective timeout is `min(request_timeout, MAX_HTTP_TIMEOUT)`.
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::ProviderQuota` for 429
    /// - `LlmError::ProviderOutage` for 5xx after retries
    /// - `LlmError::Timeout` when the deadline elapses
    /// - `LlmError::Transport` for other network failures after retries
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(MAX_HTTP_TIMEOUT);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| LlmError::Transport("failed to clone request for retry".to_string()))?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("failed to build request: {e}")))?;

            debug!(
                attempt,
                timeout_secs = effective_timeout.as_secs(),
                "executing model HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        return Err(map_client_error(status));
                    }

                    if status.is_server_error() {
                        if attempt <= MAX_RETRIES {
                            let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                            warn!(status = %status, attempt, backoff_secs = backoff.as_secs(), "provider 5xx, retrying");
                            tokio::time::sleep(backoff).await;
                            continue;
                        }
                        return Err(LlmError::ProviderOutage(format!(
                            "provider returned {status} after {attempt} attempts"
                        )));
                    }

                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout {
                        duration: effective_timeout,
                    });
                }
                Err(e) => {
                    if attempt <= MAX_RETRIES {
                        let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                        warn!(error = %e, attempt, backoff_secs = backoff.as_secs(), "network failure, retrying");
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(LlmError::Transport(format!(
                        "network failure after {attempt} attempts: {e}"
                    )));
                }
            }
        }
    }
}

fn map_client_error(status: StatusCode) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::ProviderAuth(format!("provider returned {status}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("provider returned {status}"))
        }
        _ => LlmError::Transport(format!("provider returned {status}")),
    }
}
