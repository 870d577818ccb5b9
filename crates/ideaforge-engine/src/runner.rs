//! Durable bookkeeping around one phase execution.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use ideaforge_phases::{PhaseExecutor, PhaseInput, PhaseOutcome, PhaseOutput};
use ideaforge_storage::{Storage, StorageError};
use ideaforge_trace::{GenerationRecord, TraceRecorder};
use ideaforge_types::{PhaseState, PhaseStatus, UsageRecord};

/// Wraps handler execution with phase-state rows, usage persistence and
/// best-effort trace notification.
pub struct PhaseRunner {
    executor: PhaseExecutor,
    storage: Arc<dyn Storage>,
    trace: Arc<dyn TraceRecorder>,
}

impl PhaseRunner {
    #[must_use]
    pub fn new(
        executor: PhaseExecutor,
        storage: Arc<dyn Storage>,
        trace: Arc<dyn TraceRecorder>,
    ) -> Self {
        Self {
            executor,
            storage,
            trace,
        }
    }

    /// Run one phase with state tracking.
    ///
    /// Opens a `PhaseState` row before executing and closes it exactly once
    /// afterwards, on success and failure alike. Every completed model call
    /// is persisted as a `UsageRecord`, with the trace id (if the recorder
    /// returned one) attached.
    ///
    /// # Errors
    ///
    /// Only storage failures propagate; phase-level failures are expressed
    /// in the returned outcome.
    pub async fn run(
        &self,
        project_id: Uuid,
        input: &PhaseInput,
    ) -> Result<PhaseOutcome, StorageError> {
        let mut state = PhaseState::open(project_id, input.phase(), input.record());
        let state_id = state.id;
        self.storage.insert_phase_state(state.clone()).await?;

        let outcome = self.executor.execute(input).await;

        state.status = if outcome.success {
            PhaseStatus::Completed
        } else {
            PhaseStatus::Failed
        };
        state.output = outcome.output.as_ref().map(PhaseOutput::record);
        state.error_message = outcome.error_message.clone();
        state.completed_at = Some(Utc::now());
        self.storage.update_phase_state(state).await?;

        if !outcome.success {
            let mut metadata = Map::new();
            if let Some(error) = &outcome.error_message {
                metadata.insert("error".to_string(), Value::String(error.clone()));
            }
            let event_name = format!("{}_failed", outcome.phase.as_str().to_lowercase());
            self.trace
                .record_event(project_id, &event_name, metadata)
                .await;
        }

        // Trace first, so the returned id lands on the usage row.
        for usage in &outcome.usage {
            let trace_id = self
                .trace
                .record_generation(
                    project_id,
                    GenerationRecord {
                        phase: outcome.phase,
                        model: usage.model.clone(),
                        input: redact(&input.record()),
                        output: outcome
                            .success
                            .then(|| outcome.output.as_ref().map(|o| redact(&o.record())))
                            .flatten(),
                        usage: usage.clone(),
                        error: outcome.error_message.clone(),
                    },
                )
                .await;

            self.storage
                .insert_usage_record(UsageRecord {
                    id: Uuid::new_v4(),
                    project_id,
                    phase_state_id: state_id,
                    phase: outcome.phase,
                    model: usage.model.clone(),
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                    cost_usd: usage.cost_usd,
                    latency_ms: usage.latency_ms,
                    trace_id,
                    created_at: Utc::now(),
                })
                .await?;
        }

        info!(
            %project_id,
            phase = %outcome.phase,
            success = outcome.success,
            model_calls = outcome.usage.len(),
            "phase finished"
        );
        Ok(outcome)
    }
}

/// Replace string payloads with their character counts; traces get shapes,
/// not content.
fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| match value {
                    Value::String(text) => {
                        (key.clone(), Value::from(text.chars().count()))
                    }
                    other => (key.clone(), other.clone()),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
