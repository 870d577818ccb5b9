//! Best-effort trace recording for workflow runs.
//!
//! An external observability backend (when credentials are configured) gets
//! one trace per project, one generation entry per model call, plus
//! free-form events and a final summary. Every call here is best-effort:
//! recorders never return errors and must never abort the workflow. When no
//! backend is configured the engine runs with [`NoopTraceRecorder`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use ideaforge_types::{ModelUsage, WorkflowPhase};

/// Ideas longer than this are truncated in trace metadata.
const IDEA_SUMMARY_MAX_CHARS: usize = 200;

/// One model invocation as reported to the trace backend.
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub phase: WorkflowPhase,
    pub model: String,
    /// Redacted input summary, never the full prompt.
    pub input: Value,
    /// Output summary; absent for failed calls.
    pub output: Option<Value>,
    pub usage: ModelUsage,
    pub error: Option<String>,
}

/// Summary written when a workflow run ends.
#[derive(Debug, Clone)]
pub struct TraceSummary {
    pub total_cost_usd: Decimal,
    pub total_duration_seconds: u64,
    /// "completed" or "failed".
    pub final_status: &'static str,
    pub documents_generated: u32,
}

/// Recorder for one project's trace. All methods are infallible; a backend
/// that cannot deliver must swallow and log, never propagate.
#[async_trait]
pub trait TraceRecorder: Send + Sync {
    /// Open the trace for a project run.
    async fn start_trace(&self, project_id: Uuid, idea: &str);

    /// Record one model invocation; returns the backend trace id, if any,
    /// for attachment to the usage record.
    async fn record_generation(&self, project_id: Uuid, record: GenerationRecord)
        -> Option<String>;

    /// Record a non-model workflow event.
    async fn record_event(&self, project_id: Uuid, name: &str, metadata: Map<String, Value>);

    /// Close the trace with run totals.
    async fn finalize(&self, project_id: Uuid, summary: TraceSummary);
}

/// Truncate an idea for trace metadata, respecting char boundaries.
#[must_use]
pub fn idea_summary(idea: &str) -> String {
    idea.chars().take(IDEA_SUMMARY_MAX_CHARS).collect()
}

/// Recorder used when no trace backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceRecorder;

#[async_trait]
impl TraceRecorder for NoopTraceRecorder {
    async fn start_trace(&self, _project_id: Uuid, _idea: &str) {}

    async fn record_generation(
        &self,
        _project_id: Uuid,
        _record: GenerationRecord,
    ) -> Option<String> {
        None
    }

    async fn record_event(&self, _project_id: Uuid, _name: &str, _metadata: Map<String, Value>) {}

    async fn finalize(&self, _project_id: Uuid, _summary: TraceSummary) {}
}

/// Recorder that mirrors the trace surface into structured log events.
///
/// Stands in for a real backend in single-process deployments; generation
/// ids are locally minted so usage records still carry a trace reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTraceRecorder;

#[async_trait]
impl TraceRecorder for LoggingTraceRecorder {
    async fn start_trace(&self, project_id: Uuid, idea: &str) {
        info!(
            %project_id,
            idea = %idea_summary(idea),
            "trace started"
        );
    }

    async fn record_generation(
        &self,
        project_id: Uuid,
        record: GenerationRecord,
    ) -> Option<String> {
        let generation_id = Uuid::new_v4().to_string();
        info!(
            %project_id,
            generation_id = %generation_id,
            phase = %record.phase,
            model = %record.model,
            input = %record.input,
            output = %record.output.as_ref().unwrap_or(&serde_json::Value::Null),
            total_tokens = record.usage.total_tokens,
            cost_usd = %record.usage.cost_usd,
            latency_ms = record.usage.latency_ms,
            error = record.error.as_deref(),
            "generation recorded"
        );
        Some(generation_id)
    }

    async fn record_event(&self, project_id: Uuid, name: &str, metadata: Map<String, Value>) {
        info!(
            %project_id,
            event = name,
            metadata = %serde_json::Value::Object(metadata),
            "trace event"
        );
    }

    async fn finalize(&self, project_id: Uuid, summary: TraceSummary) {
        info!(
            %project_id,
            total_cost_usd = %summary.total_cost_usd,
            total_duration_seconds = summary.total_duration_seconds,
            final_status = summary.final_status,
            documents_generated = summary.documents_generated,
            "trace finalized"
        );
    }
}
