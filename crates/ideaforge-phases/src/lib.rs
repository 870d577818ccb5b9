//! Phase handlers for the document pipeline.
//!
//! The five phases form a closed set, dispatched over typed input/output
//! enums rather than name-keyed maps. [`PhaseExecutor`] owns the model
//! caller, the cost estimator and the per-phase model profiles; each phase
//! module builds its prompt, makes its calls and validates the output.
//!
//! A handler never returns an error: transport failures, parse failures and
//! validation failures all become a failed [`PhaseOutcome`]. Usage telemetry
//! is attached for every model call that completed, including calls whose
//! content was later rejected.

mod detection;
mod domain_discovery;
mod execution_plan;
mod requirements;
mod tech_stack;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use ideaforge_config::{ModelProfile, ModelsConfig};
use ideaforge_llm::{CostEstimator, LlmError, ModelCaller, ModelRequest};
use ideaforge_types::{DeliveryApproach, ModelUsage, WorkflowPhase};

pub use detection::DetectionVerdict;

/// Typed input to one phase execution.
#[derive(Debug, Clone)]
pub enum PhaseInput {
    Detection {
        idea: String,
    },
    DomainDiscovery {
        idea: String,
    },
    Requirements {
        idea: String,
        domain_summary: Option<String>,
    },
    TechStack {
        prd_md: String,
    },
    ExecutionPlan {
        prd_md: String,
        tech_stack_md: String,
    },
}

impl PhaseInput {
    #[must_use]
    pub fn phase(&self) -> WorkflowPhase {
        match self {
            Self::Detection { .. } => WorkflowPhase::Detection,
            Self::DomainDiscovery { .. } => WorkflowPhase::DomainDiscovery,
            Self::Requirements { .. } => WorkflowPhase::Requirements,
            Self::TechStack { .. } => WorkflowPhase::TechStack,
            Self::ExecutionPlan { .. } => WorkflowPhase::ExecutionPlan,
        }
    }

    /// JSON snapshot recorded verbatim on the phase-state row.
    #[must_use]
    pub fn record(&self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Detection { idea } | Self::DomainDiscovery { idea } => {
                map.insert("idea".to_string(), Value::String(idea.clone()));
            }
            Self::Requirements {
                idea,
                domain_summary,
            } => {
                map.insert("idea".to_string(), Value::String(idea.clone()));
                if let Some(summary) = domain_summary {
                    map.insert(
                        "domain_summary".to_string(),
                        Value::String(summary.clone()),
                    );
                }
            }
            Self::TechStack { prd_md } => {
                map.insert("prd_md".to_string(), Value::String(prd_md.clone()));
            }
            Self::ExecutionPlan {
                prd_md,
                tech_stack_md,
            } => {
                map.insert("prd_md".to_string(), Value::String(prd_md.clone()));
                map.insert(
                    "tech_stack_md".to_string(),
                    Value::String(tech_stack_md.clone()),
                );
            }
        }
        Value::Object(map)
    }
}

/// Typed output of one successful phase execution.
#[derive(Debug, Clone)]
pub enum PhaseOutput {
    Detection(DetectionVerdict),
    DomainDiscovery { domain_summary_md: String },
    Requirements { prd_md: String },
    TechStack { tech_stack_md: String },
    ExecutionPlan {
        execution_plan_md: String,
        approach: DeliveryApproach,
    },
}

impl PhaseOutput {
    /// JSON snapshot recorded on the phase-state row.
    #[must_use]
    pub fn record(&self) -> Value {
        match self {
            Self::Detection(verdict) => {
                serde_json::to_value(verdict).unwrap_or(Value::Null)
            }
            Self::DomainDiscovery { domain_summary_md } => {
                serde_json::json!({ "domain_summary_md": domain_summary_md })
            }
            Self::Requirements { prd_md } => serde_json::json!({ "prd_md": prd_md }),
            Self::TechStack { tech_stack_md } => {
                serde_json::json!({ "tech_stack_md": tech_stack_md })
            }
            Self::ExecutionPlan {
                execution_plan_md,
                approach,
            } => serde_json::json!({
                "execution_plan_md": execution_plan_md,
                "approach": approach,
            }),
        }
    }
}

/// Result of one phase execution attempt.
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub phase: WorkflowPhase,
    pub success: bool,
    pub output: Option<PhaseOutput>,
    pub error_message: Option<String>,
    /// One entry per completed model call, in call order. Present on
    /// failures too when the call itself completed.
    pub usage: Vec<ModelUsage>,
}

impl PhaseOutcome {
    #[must_use]
    pub fn succeeded(phase: WorkflowPhase, output: PhaseOutput, usage: Vec<ModelUsage>) -> Self {
        Self {
            phase,
            success: true,
            output: Some(output),
            error_message: None,
            usage,
        }
    }

    #[must_use]
    pub fn failed(
        phase: WorkflowPhase,
        error_message: impl Into<String>,
        usage: Vec<ModelUsage>,
    ) -> Self {
        Self {
            phase,
            success: false,
            output: None,
            error_message: Some(error_message.into()),
            usage,
        }
    }
}

/// One completed model call: validated later, billed always.
pub(crate) struct CompletedCall {
    pub content: String,
    pub usage: ModelUsage,
}

/// Dispatcher over the closed set of phase handlers.
pub struct PhaseExecutor {
    caller: Arc<dyn ModelCaller>,
    estimator: CostEstimator,
    models: ModelsConfig,
    call_timeout: Duration,
}

impl PhaseExecutor {
    #[must_use]
    pub fn new(
        caller: Arc<dyn ModelCaller>,
        estimator: CostEstimator,
        models: ModelsConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            caller,
            estimator,
            models,
            call_timeout,
        }
    }

    /// Execute one phase. Infallible by construction: every failure mode is
    /// expressed as an unsuccessful outcome.
    pub async fn execute(&self, input: &PhaseInput) -> PhaseOutcome {
        match input {
            PhaseInput::Detection { idea } => detection::run(self, idea).await,
            PhaseInput::DomainDiscovery { idea } => domain_discovery::run(self, idea).await,
            PhaseInput::Requirements {
                idea,
                domain_summary,
            } => requirements::run(self, idea, domain_summary.as_deref()).await,
            PhaseInput::TechStack { prd_md } => tech_stack::run(self, prd_md).await,
            PhaseInput::ExecutionPlan {
                prd_md,
                tech_stack_md,
            } => execution_plan::run(self, prd_md, tech_stack_md).await,
        }
    }

    pub(crate) fn models(&self) -> &ModelsConfig {
        &self.models
    }

    pub(crate) fn request(&self, profile: &ModelProfile, prompt: String) -> ModelRequest {
        ModelRequest::new(profile.model.clone(), prompt, self.call_timeout)
            .with_temperature(profile.temperature)
            .with_max_tokens(profile.max_tokens)
    }

    /// Invoke the model and price the reported token usage. Cost lookup is
    /// keyed by the requested model identifier, which is the one the cost
    /// table knows, not the provider-decorated one the response echoes.
    pub(crate) async fn call(&self, request: ModelRequest) -> Result<CompletedCall, LlmError> {
        let model = request.model.clone();
        let response = self.caller.invoke(request).await?;
        let cost_usd = self.estimator.estimate(&model, &response.usage);
        Ok(CompletedCall {
            content: response.content,
            usage: ModelUsage {
                model,
                prompt_tokens: response.usage.prompt_tokens,
                completion_tokens: response.usage.completion_tokens,
                total_tokens: response.usage.total_tokens,
                cost_usd,
                latency_ms: response.latency_ms,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model-caller double shared by the phase tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use ideaforge_config::{ModelsConfig, PricingConfig};
    use ideaforge_llm::{
        CostEstimator, LlmError, ModelCaller, ModelRequest, ModelResponse, TokenUsage,
    };

    use crate::PhaseExecutor;

    pub(crate) struct ScriptedCaller {
        responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedCaller {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn push_content(&self, content: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(ModelResponse {
                    content: content.to_string(),
                    model: "scripted".to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 100,
                        completion_tokens: 200,
                        total_tokens: 300,
                    },
                    latency_ms: 1500,
                }));
        }

        pub(crate) fn push_error(&self, error: LlmError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub(crate) fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelCaller for ScriptedCaller {
        async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("scripted caller ran out of responses"))
        }
    }

    pub(crate) fn executor(caller: Arc<ScriptedCaller>) -> PhaseExecutor {
        PhaseExecutor::new(
            caller,
            CostEstimator::new(&PricingConfig::default()),
            ModelsConfig::default(),
            Duration::from_secs(120),
        )
    }
}
