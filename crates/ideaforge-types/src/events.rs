//! Progress events fanned out to live observers of a workflow.
//!
//! Events serialize as `{"type": "...", ...fields, "timestamp": "..."}`.
//! The timestamp is assigned by the broadcaster at publish time when the
//! emitter left it empty.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::WorkflowPhase;

/// Event payload variants; `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEventKind {
    PhaseStarted {
        phase: WorkflowPhase,
        message: String,
    },
    PhaseProgress {
        phase: WorkflowPhase,
        message: String,
    },
    PhaseCompleted {
        phase: WorkflowPhase,
        duration_seconds: u64,
        cost_usd: Decimal,
    },
    PhaseFailed {
        phase: WorkflowPhase,
        error: String,
        retry_available: bool,
    },
    WorkflowCompleted {
        total_duration_seconds: u64,
        total_cost_usd: Decimal,
        documents_generated: u32,
    },
    WorkflowFailed {
        error: String,
    },
}

/// An event plus its server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    #[serde(flatten)]
    pub kind: WorkflowEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WorkflowEvent {
    /// Wrap a payload with no timestamp; the broadcaster stamps it.
    #[must_use]
    pub fn new(kind: WorkflowEventKind) -> Self {
        Self {
            kind,
            timestamp: None,
        }
    }
}

impl From<WorkflowEventKind> for WorkflowEvent {
    fn from(kind: WorkflowEventKind) -> Self {
        Self::new(kind)
    }
}
