//! OpenRouter backend: OpenAI-compatible chat-completions over HTTP.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ideaforge_config::Config;

use crate::error::LlmError;
use crate::http_client::HttpClient;
use crate::types::{ModelCaller, ModelRequest, ModelResponse, ResponseFormat, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const HTTP_REFERER: &str = "https://github.com/ideaforge/ideaforge";

const X_TITLE: &str = "ideaforge";

/// Production [`ModelCaller`] talking to OpenRouter.
#[derive(Clone)]
pub struct OpenRouterCaller {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenRouterCaller {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be
    /// built.
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
        })
    }

    /// Build a caller from configuration, reading the API key from the
    /// environment variable the config names.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the key variable is unset or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.llm.api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "OpenRouter API key not found in environment variable '{}'",
                config.llm.api_key_env
            ))
        })?;
        Self::new(api_key, config.llm.base_url.clone())
    }
}

#[async_trait]
impl ModelCaller for OpenRouterCaller {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            json_mode = request.response_format.is_some(),
            timeout_secs = request.timeout.as_secs(),
            "invoking OpenRouter"
        );

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_message {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format,
            stream: false,
        };

        let builder = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", HTTP_REFERER)
            .header("X-Title", X_TITLE)
            .header("Content-Type", "application/json")
            .json(&body);

        let started = Instant::now();
        let response = self
            .client
            .execute_with_retry(builder, request.timeout)
            .await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to parse OpenRouter response: {e}")))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Transport("OpenRouter response missing choices[0]".to_string()))?;
        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("OpenRouter response missing content in choices[0]".to_string())
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u
                    .total_tokens
                    .unwrap_or(u.prompt_tokens + u.completion_tokens),
            })
            .unwrap_or_default();

        debug!(
            model = %request.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            latency_ms,
            "OpenRouter invocation completed"
        );

        Ok(ModelResponse {
            content,
            model: request.model,
            usage,
            latency_ms,
        })
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_json_mode() {
        let body = ChatRequest {
            model: "openai/gpt-4o-mini".to_string(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "classify".to_string(),
            }],
            temperature: 0.3,
            max_tokens: 500,
            response_format: Some(ResponseFormat::JsonObject),
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_request_omits_absent_response_format() {
        let body = ChatRequest {
            model: "openai/gpt-4o".to_string(),
            messages: vec![],
            temperature: 0.5,
            max_tokens: 3000,
            response_format: None,
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn missing_total_tokens_falls_back_to_sum() {
        let wire: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"hi"}}],
                "usage":{"prompt_tokens":10,"completion_tokens":5}}"#,
        )
        .unwrap();
        let usage = wire.usage.unwrap();
        assert_eq!(
            usage.total_tokens.unwrap_or(usage.prompt_tokens + usage.completion_tokens),
            15
        );
    }

    #[test]
    fn from_config_missing_api_key_is_misconfiguration() {
        let mut config = Config::default();
        config.llm.api_key_env = "IDEAFORGE_TEST_KEY_THAT_IS_UNSET".to_string();

        match OpenRouterCaller::from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("IDEAFORGE_TEST_KEY_THAT_IS_UNSET"));
            }
            _ => panic!("expected Misconfiguration for missing API key"),
        }
    }
}
