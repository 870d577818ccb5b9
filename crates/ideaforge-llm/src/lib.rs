//! Model-caller abstraction for ideaforge
//!
//! All model access goes through the [`ModelCaller`] trait so the pipeline
//! can run against the OpenRouter HTTP backend in production and a scripted
//! double in tests. The crate also owns cost estimation, since token pricing
//! is a property of the model layer, not of any phase.

mod cost;
mod error;
pub(crate) mod http_client;
mod openrouter;
mod types;

pub use cost::CostEstimator;
pub use error::LlmError;
pub use openrouter::OpenRouterCaller;
pub use types::{ModelCaller, ModelRequest, ModelResponse, ResponseFormat, TokenUsage};
