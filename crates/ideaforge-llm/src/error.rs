//! Error taxonomy for model calls.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by a [`crate::ModelCaller`].
///
/// Transport-level failures carry no usage telemetry; the call never
/// completed. Callers convert these into phase failures.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or protocol failure before a usable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider rejected credentials (401/403, missing API key).
    #[error("provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota or rate limit exceeded (429).
    #[error("provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx after retries).
    #[error("provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation exceeded its bounded timeout.
    #[error("timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Invalid caller construction or settings.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
}
