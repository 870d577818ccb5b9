//! Core types for the model-caller abstraction.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Structured output request for JSON-mode calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
}

/// Input to one model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier, e.g. `anthropic/claude-3.5-sonnet`.
    pub model: String,
    /// User prompt content.
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// JSON mode for classification calls.
    pub response_format: Option<ResponseFormat>,
    pub system_message: Option<String>,
    /// Bounded timeout; the call fails (not retried) once exceeded.
    pub timeout: Duration,
}

impl ModelRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 4000,
            response_format: None,
            system_message: None,
            timeout,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.response_format = Some(ResponseFormat::JsonObject);
        self
    }

    #[must_use]
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }
}

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Result of one completed model invocation.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
    /// Model the provider actually served.
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

/// Trait all model backends implement.
///
/// A failing call returns [`LlmError`]; a completed call always carries
/// usage and latency, even when downstream validation rejects the content.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_applies_overrides() {
        let request = ModelRequest::new("openai/gpt-4o-mini", "classify", Duration::from_secs(60))
            .with_temperature(0.3)
            .with_max_tokens(500)
            .with_json_output();

        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.response_format, Some(ResponseFormat::JsonObject));
        assert!(request.system_message.is_none());
    }

    #[test]
    fn response_format_serializes_as_openai_shape() {
        let value = serde_json::to_value(ResponseFormat::JsonObject).unwrap();
        assert_eq!(value["type"], "json_object");
    }
}
