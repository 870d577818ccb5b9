//! Workflow orchestration core.
//!
//! Drives a project through detection, optional domain discovery,
//! requirements, tech stack and execution plan. Every phase is wrapped in
//! durable state tracking by the [`PhaseRunner`], progress is fanned out via
//! the [`ProgressBroadcaster`], and the [`WorkflowEngine`] owns the
//! top-level fault boundary.

mod broadcaster;
mod engine;
mod runner;
pub mod state_machine;

pub use broadcaster::ProgressBroadcaster;
pub use engine::{EngineError, WorkflowEngine};
pub use runner::PhaseRunner;
