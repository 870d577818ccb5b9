//! ideaforge - multi-phase LLM pipeline turning a product idea into design
//! documents
//!
//! Given one product idea, ideaforge runs a staged pipeline: a cheap
//! classification pass decides whether the idea warrants a dedicated
//! domain-discovery session, then requirements (PRD), tech-stack and
//! execution-plan documents are generated in order, each grounded in the
//! previous one. Phase state, model usage and generated documents are
//! persisted after every step; progress is fanned out live to subscribed
//! observers.
//!
//! The crate can be used two ways:
//! - **CLI**: `ideaforge run "a recipe sharing app"` drives the full
//!   pipeline and prints progress as it happens.
//! - **Library**: construct the collaborators yourself and drive
//!   [`WorkflowEngine`] directly; every component is injected, nothing is
//!   a process-wide singleton.

pub mod cli;

pub use ideaforge_config::Config;
pub use ideaforge_engine::{
    EngineError, PhaseRunner, ProgressBroadcaster, WorkflowEngine, state_machine,
};
pub use ideaforge_llm::{CostEstimator, LlmError, ModelCaller, OpenRouterCaller};
pub use ideaforge_phases::{PhaseExecutor, PhaseInput, PhaseOutcome, PhaseOutput};
pub use ideaforge_prompts as prompts;
pub use ideaforge_storage::{MemoryStorage, Storage, StorageError};
pub use ideaforge_trace::{LoggingTraceRecorder, NoopTraceRecorder, TraceRecorder};
pub use ideaforge_types::{
    DeliveryApproach, DocumentType, GeneratedDocument, PhaseState, PhaseStatus, Project,
    ProjectStatus, UsageRecord, WorkflowEvent, WorkflowEventKind, WorkflowPhase,
};
