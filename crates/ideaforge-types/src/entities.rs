//! Persisted entities of the workflow core.
//!
//! These mirror the durable state the engine commits after every phase:
//! the project row, one phase-state row per execution attempt, append-only
//! usage records, and documents upserted by (project, type).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{DocumentType, PhaseStatus, WorkflowPhase};

/// Overall status of a project's workflow run.
///
/// Transitions only `Created → Processing → {Completed, Failed}`;
/// `Completed` and `Failed` are terminal for a given run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Created,
    Processing,
    Completed,
    Failed,
}

/// A unit of work: one product idea and the state of its pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub idea: String,
    pub status: ProjectStatus,
    pub current_phase: Option<WorkflowPhase>,
    /// Accumulates phase outputs and summary stats over the run.
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Project {
    #[must_use]
    pub fn new(user_id: Uuid, idea: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            idea: idea.into(),
            status: ProjectStatus::Created,
            current_phase: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// One record per phase execution attempt.
///
/// Every attempt gets a fresh record, even when a phase is re-run after a
/// failed workflow; a record is opened `InProgress` and closed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseState {
    pub id: Uuid,
    pub project_id: Uuid,
    pub phase: WorkflowPhase,
    pub status: PhaseStatus,
    /// Input payload recorded verbatim at start.
    pub input: Value,
    pub output: Option<Value>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PhaseState {
    /// Open a new in-progress record for one attempt.
    #[must_use]
    pub fn open(project_id: Uuid, phase: WorkflowPhase, input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            phase,
            status: PhaseStatus::InProgress,
            input,
            output: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// One row per model invocation, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub phase_state_id: Uuid,
    pub phase: WorkflowPhase,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Non-negative, rounded to 6 decimal places.
    pub cost_usd: Decimal,
    pub latency_ms: u64,
    pub trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Token and cost telemetry attached to one model invocation, carried on a
/// phase outcome before it is persisted as a [`UsageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: Decimal,
    pub latency_ms: u64,
}

/// One generated markdown document, unique per (project, type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: Uuid,
    pub project_id: Uuid,
    pub doc_type: DocumentType,
    pub content_md: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeneratedDocument {
    #[must_use]
    pub fn new(
        project_id: Uuid,
        doc_type: DocumentType,
        content_md: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            doc_type,
            content_md: content_md.into(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}
