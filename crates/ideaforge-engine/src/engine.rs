//! The workflow engine: drives a project through the pipeline.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use ideaforge_phases::{PhaseInput, PhaseOutcome, PhaseOutput};
use ideaforge_storage::{Storage, StorageError};
use ideaforge_trace::{TraceRecorder, TraceSummary};
use ideaforge_types::{
    DeliveryApproach, DocumentType, GeneratedDocument, ProjectStatus, WorkflowEvent,
    WorkflowEventKind, WorkflowPhase,
};

use crate::broadcaster::ProgressBroadcaster;
use crate::runner::PhaseRunner;

/// Unexpected faults inside the pipeline. These never escape
/// [`WorkflowEngine::execute_workflow`]; they are funneled through the
/// failure path and reported as a `false` return.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("phase {0} completed without usable output")]
    MissingPhaseOutput(WorkflowPhase),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Orchestrates one workflow run per call. Holds no per-run state, so one
/// engine serves any number of concurrent projects.
pub struct WorkflowEngine {
    storage: Arc<dyn Storage>,
    runner: PhaseRunner,
    broadcaster: Arc<ProgressBroadcaster>,
    trace: Arc<dyn TraceRecorder>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        runner: PhaseRunner,
        broadcaster: Arc<ProgressBroadcaster>,
        trace: Arc<dyn TraceRecorder>,
    ) -> Self {
        Self {
            storage,
            runner,
            broadcaster,
            trace,
        }
    }

    /// Execute the complete workflow for a project.
    ///
    /// Returns `true` iff every phase succeeded. No fault escapes: phase
    /// failures and unexpected errors alike mark the project `FAILED`,
    /// broadcast the failure, and yield `false`.
    pub async fn execute_workflow(&self, project_id: Uuid) -> bool {
        match self.run_pipeline(project_id).await {
            Ok(completed) => completed,
            Err(fault) => {
                error!(%project_id, error = %fault, "workflow fault");
                self.handle_failure(project_id, &fault.to_string()).await;
                false
            }
        }
    }

    async fn run_pipeline(&self, project_id: Uuid) -> Result<bool, EngineError> {
        let project = self.storage.get_project(project_id).await?;
        info!(%project_id, "starting workflow");

        self.trace.start_trace(project_id, &project.idea).await;
        self.trace
            .record_event(project_id, "workflow_started", Map::new())
            .await;

        self.update_status(
            project_id,
            ProjectStatus::Processing,
            Some(WorkflowPhase::Detection),
            None,
        )
        .await?;

        // Detection
        let Some(outcome) = self
            .run_phase(
                project_id,
                &PhaseInput::Detection {
                    idea: project.idea.clone(),
                },
                "Analyzing project complexity and determining workflow approach...",
            )
            .await?
        else {
            return Ok(false);
        };
        let Some(PhaseOutput::Detection(verdict)) = outcome.output else {
            return Err(EngineError::MissingPhaseOutput(WorkflowPhase::Detection));
        };
        let use_domain_discovery = verdict.use_event_storming;
        info!(
            %project_id,
            use_domain_discovery,
            remaining = crate::state_machine::phase_order(use_domain_discovery).len() - 1,
            "detection complete"
        );

        let mut detection_meta = Map::new();
        detection_meta.insert(
            "detection".to_string(),
            serde_json::to_value(&verdict).unwrap_or(Value::Null),
        );
        self.update_status(
            project_id,
            ProjectStatus::Processing,
            Some(WorkflowPhase::Detection),
            Some(detection_meta),
        )
        .await?;

        // Domain discovery (conditional)
        let mut domain_summary = None;
        if use_domain_discovery {
            self.update_status(
                project_id,
                ProjectStatus::Processing,
                Some(WorkflowPhase::DomainDiscovery),
                None,
            )
            .await?;

            let Some(outcome) = self
                .run_phase(
                    project_id,
                    &PhaseInput::DomainDiscovery {
                        idea: project.idea.clone(),
                    },
                    "Running domain discovery to map business events and boundaries...",
                )
                .await?
            else {
                return Ok(false);
            };
            let Some(PhaseOutput::DomainDiscovery { domain_summary_md }) = outcome.output.clone()
            else {
                return Err(EngineError::MissingPhaseOutput(
                    WorkflowPhase::DomainDiscovery,
                ));
            };

            self.save_document(
                project_id,
                DocumentType::EventStorming,
                &domain_summary_md,
                document_metadata(&outcome, None),
            )
            .await?;
            domain_summary = Some(domain_summary_md);
        }

        // Requirements
        self.update_status(
            project_id,
            ProjectStatus::Processing,
            Some(WorkflowPhase::Requirements),
            None,
        )
        .await?;
        let Some(outcome) = self
            .run_phase(
                project_id,
                &PhaseInput::Requirements {
                    idea: project.idea.clone(),
                    domain_summary: domain_summary.clone(),
                },
                "Generating Product Requirements Document (PRD)...",
            )
            .await?
        else {
            return Ok(false);
        };
        let Some(PhaseOutput::Requirements { prd_md }) = outcome.output.clone() else {
            return Err(EngineError::MissingPhaseOutput(WorkflowPhase::Requirements));
        };
        self.save_document(
            project_id,
            DocumentType::Prd,
            &prd_md,
            document_metadata(&outcome, None),
        )
        .await?;

        // Tech stack
        self.update_status(
            project_id,
            ProjectStatus::Processing,
            Some(WorkflowPhase::TechStack),
            None,
        )
        .await?;
        let Some(outcome) = self
            .run_phase(
                project_id,
                &PhaseInput::TechStack {
                    prd_md: prd_md.clone(),
                },
                "Determining optimal tech stack and architecture...",
            )
            .await?
        else {
            return Ok(false);
        };
        let Some(PhaseOutput::TechStack { tech_stack_md }) = outcome.output.clone() else {
            return Err(EngineError::MissingPhaseOutput(WorkflowPhase::TechStack));
        };
        self.save_document(
            project_id,
            DocumentType::TechStack,
            &tech_stack_md,
            document_metadata(&outcome, None),
        )
        .await?;

        // Execution plan
        self.update_status(
            project_id,
            ProjectStatus::Processing,
            Some(WorkflowPhase::ExecutionPlan),
            None,
        )
        .await?;
        let Some(outcome) = self
            .run_phase(
                project_id,
                &PhaseInput::ExecutionPlan {
                    prd_md: prd_md.clone(),
                    tech_stack_md: tech_stack_md.clone(),
                },
                "Creating detailed execution plan with stage gates...",
            )
            .await?
        else {
            return Ok(false);
        };
        let Some(PhaseOutput::ExecutionPlan {
            execution_plan_md,
            approach,
        }) = outcome.output.clone()
        else {
            return Err(EngineError::MissingPhaseOutput(WorkflowPhase::ExecutionPlan));
        };
        self.save_document(
            project_id,
            DocumentType::ExecutionPlan,
            &execution_plan_md,
            document_metadata(&outcome, Some(approach)),
        )
        .await?;

        // Totals and completion
        let totals = self.storage.usage_totals(project_id).await?;
        let total_duration_seconds = totals.latency_ms / 1000;
        let total_cost = totals.cost_usd;
        let documents_generated: u32 = if use_domain_discovery { 4 } else { 3 };

        let mut summary = Map::new();
        summary.insert(
            "use_event_storming".to_string(),
            Value::Bool(use_domain_discovery),
        );
        summary.insert(
            "use_vertical_approach".to_string(),
            Value::Bool(approach == DeliveryApproach::Vertical),
        );
        summary.insert(
            "total_cost_usd".to_string(),
            serde_json::to_value(total_cost).unwrap_or(Value::Null),
        );
        summary.insert(
            "total_duration_seconds".to_string(),
            Value::from(total_duration_seconds),
        );
        self.update_status(
            project_id,
            ProjectStatus::Completed,
            Some(WorkflowPhase::ExecutionPlan),
            Some(summary),
        )
        .await?;

        self.trace
            .finalize(
                project_id,
                TraceSummary {
                    total_cost_usd: total_cost,
                    total_duration_seconds,
                    final_status: "completed",
                    documents_generated,
                },
            )
            .await;

        self.publish(
            project_id,
            WorkflowEventKind::WorkflowCompleted {
                total_duration_seconds,
                total_cost_usd: total_cost,
                documents_generated,
            },
        );

        info!(%project_id, %total_cost, "workflow completed");
        Ok(true)
    }

    /// Run one phase with progress events around it. `Ok(None)` means the
    /// phase failed and the workflow-level failure path has already run.
    async fn run_phase(
        &self,
        project_id: Uuid,
        input: &PhaseInput,
        message: &str,
    ) -> Result<Option<PhaseOutcome>, EngineError> {
        let phase = input.phase();
        self.publish(
            project_id,
            WorkflowEventKind::PhaseStarted {
                phase,
                message: message.to_string(),
            },
        );

        let started = Instant::now();
        let outcome = self.runner.run(project_id, input).await?;

        if outcome.success {
            self.publish(
                project_id,
                WorkflowEventKind::PhaseCompleted {
                    phase,
                    duration_seconds: started.elapsed().as_secs(),
                    cost_usd: phase_cost(&outcome),
                },
            );
            Ok(Some(outcome))
        } else {
            let error = outcome
                .error_message
                .clone()
                .unwrap_or_else(|| format!("{phase} failed"));
            self.publish(
                project_id,
                WorkflowEventKind::PhaseFailed {
                    phase,
                    error: error.clone(),
                    retry_available: true,
                },
            );
            self.handle_failure(project_id, &error).await;
            Ok(None)
        }
    }

    async fn save_document(
        &self,
        project_id: Uuid,
        doc_type: DocumentType,
        content_md: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), StorageError> {
        self.storage
            .upsert_document(GeneratedDocument::new(
                project_id, doc_type, content_md, metadata,
            ))
            .await
    }

    async fn update_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
        current_phase: Option<WorkflowPhase>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<(), StorageError> {
        let mut project = self.storage.get_project(project_id).await?;
        project.status = status;
        project.current_phase = current_phase;
        project.updated_at = Utc::now();
        if status == ProjectStatus::Completed {
            project.completed_at = Some(Utc::now());
        }
        if let Some(extra) = metadata {
            project.metadata.extend(extra);
        }
        self.storage.update_project(project).await
    }

    /// Terminal failure path: mark the project failed, broadcast, and
    /// notify the trace. Best-effort; storage errors here are logged, not
    /// propagated, because the run is already lost.
    async fn handle_failure(&self, project_id: Uuid, error_message: &str) {
        let mut metadata = Map::new();
        metadata.insert(
            "error".to_string(),
            Value::String(error_message.to_string()),
        );
        if let Err(storage_error) = self
            .update_status(project_id, ProjectStatus::Failed, None, Some(metadata.clone()))
            .await
        {
            error!(%project_id, error = %storage_error, "failed to record workflow failure");
        }

        self.publish(
            project_id,
            WorkflowEventKind::WorkflowFailed {
                error: error_message.to_string(),
            },
        );
        self.trace
            .record_event(project_id, "workflow_failed", metadata)
            .await;
        error!(%project_id, error = error_message, "workflow failed");
    }

    fn publish(&self, project_id: Uuid, kind: WorkflowEventKind) {
        self.broadcaster.publish(project_id, WorkflowEvent::new(kind));
    }
}

/// Cost of one phase: sum over its model calls, 6-decimal precision.
fn phase_cost(outcome: &PhaseOutcome) -> Decimal {
    outcome
        .usage
        .iter()
        .map(|usage| usage.cost_usd)
        .sum::<Decimal>()
        .round_dp(6)
}

/// Shared metadata for persisted documents: the generating model, plus the
/// delivery approach for the execution plan.
fn document_metadata(
    outcome: &PhaseOutcome,
    approach: Option<DeliveryApproach>,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(usage) = outcome.usage.last() {
        metadata.insert("model".to_string(), Value::String(usage.model.clone()));
    }
    if let Some(approach) = approach {
        metadata.insert(
            "approach".to_string(),
            serde_json::to_value(approach).unwrap_or(Value::Null),
        );
    }
    metadata
}
