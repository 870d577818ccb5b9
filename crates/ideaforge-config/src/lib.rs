//! Configuration model for ideaforge
//!
//! Configuration is a TOML file with serde defaults for every field, so an
//! empty file (or no file) yields a working setup. The OpenRouter API key is
//! never stored in the file; only the name of the environment variable that
//! holds it is configurable.
//!
//! ```toml
//! [llm]
//! api_key_env = "OPENROUTER_API_KEY"
//! call_timeout_secs = 120
//!
//! [llm.models.detection]
//! model = "openai/gpt-4o-mini"
//! temperature = 0.3
//!
//! [pricing.models."anthropic/claude-3.5-sonnet"]
//! input = "3.00"
//! output = "15.00"
//! ```

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ideaforge_types::WorkflowPhase;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub llm: LlmConfig,
    pub pricing: PricingConfig,
    pub trace: TraceConfig,
}

/// Model-caller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Environment variable holding the OpenRouter API key.
    pub api_key_env: String,
    /// Override the chat-completions endpoint (testing, proxies).
    pub base_url: Option<String>,
    /// Bounded timeout applied to every model call.
    pub call_timeout_secs: u64,
    pub models: ModelsConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: None,
            call_timeout_secs: 120,
            models: ModelsConfig::default(),
        }
    }
}

/// Model, sampling temperature and completion budget for one kind of call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelProfile {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3.5-sonnet".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl ModelProfile {
    fn new(model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }
}

/// Per-phase model profiles.
///
/// Classification steps use a cheap model at low temperature with a small
/// completion budget; document generation uses larger models. Defaults
/// match the production pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    #[serde(default = "default_detection")]
    pub detection: ModelProfile,
    #[serde(default = "default_domain_discovery")]
    pub domain_discovery: ModelProfile,
    #[serde(default = "default_requirements")]
    pub requirements: ModelProfile,
    #[serde(default = "default_tech_stack")]
    pub tech_stack: ModelProfile,
    #[serde(default = "default_execution_plan")]
    pub execution_plan: ModelProfile,
    /// Auxiliary approach classification inside the execution-plan phase.
    #[serde(default = "default_approach")]
    pub approach: ModelProfile,
}

fn default_detection() -> ModelProfile {
    ModelProfile::new("openai/gpt-4o-mini", 0.3, 500)
}

fn default_domain_discovery() -> ModelProfile {
    ModelProfile::new("anthropic/claude-3.5-sonnet", 0.7, 4000)
}

fn default_requirements() -> ModelProfile {
    ModelProfile::new("anthropic/claude-3.5-sonnet", 0.7, 4000)
}

fn default_tech_stack() -> ModelProfile {
    ModelProfile::new("openai/gpt-4o", 0.5, 3000)
}

fn default_execution_plan() -> ModelProfile {
    ModelProfile::new("anthropic/claude-3.5-sonnet", 0.6, 4000)
}

fn default_approach() -> ModelProfile {
    ModelProfile::new("openai/gpt-4o-mini", 0.3, 300)
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detection: default_detection(),
            domain_discovery: default_domain_discovery(),
            requirements: default_requirements(),
            tech_stack: default_tech_stack(),
            execution_plan: default_execution_plan(),
            approach: default_approach(),
        }
    }
}

impl ModelsConfig {
    /// Resolve the profile for a pipeline phase.
    #[must_use]
    pub fn profile_for_phase(&self, phase: WorkflowPhase) -> &ModelProfile {
        match phase {
            WorkflowPhase::Detection => &self.detection,
            WorkflowPhase::DomainDiscovery => &self.domain_discovery,
            WorkflowPhase::Requirements => &self.requirements,
            WorkflowPhase::TechStack => &self.tech_stack,
            WorkflowPhase::ExecutionPlan => &self.execution_plan,
        }
    }
}

/// Per-1M-token USD rate pair for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRate {
    pub input: Decimal,
    pub output: Decimal,
}

/// Cost-estimation rates. Unknown models fall back to the default pair
/// rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub default_input_per_mtok: Decimal,
    pub default_output_per_mtok: Decimal,
    pub models: HashMap<String, ModelRate>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            // GPT-4o rates, the conservative fallback for unknown models.
            default_input_per_mtok: Decimal::new(250, 2),
            default_output_per_mtok: Decimal::new(1000, 2),
            models: HashMap::new(),
        }
    }
}

/// Trace-recorder settings. Disabled unless credentials are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    pub enabled: bool,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve the model profile for a pipeline phase.
    #[must_use]
    pub fn profile_for_phase(&self, phase: WorkflowPhase) -> &ModelProfile {
        self.llm.models.profile_for_phase(phase)
    }
}
