//! Shared types for the ideaforge pipeline
//!
//! This crate defines the phase and status enums, the four persisted
//! entities (project, phase state, usage record, generated document) and
//! the progress events fanned out to live observers. It carries no logic
//! beyond constructors and small accessors so every other crate can depend
//! on it without cycles.

mod entities;
mod events;

pub use entities::{
    GeneratedDocument, ModelUsage, PhaseState, Project, ProjectStatus, UsageRecord,
};
pub use events::{WorkflowEvent, WorkflowEventKind};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One discrete step of the document-generation pipeline.
///
/// `DomainDiscovery` is conditional: it runs only when the detection phase
/// flags the idea as complex enough to warrant a domain-events narrative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Detection,
    DomainDiscovery,
    Requirements,
    TechStack,
    ExecutionPlan,
}

impl WorkflowPhase {
    /// Stable string form used in persisted state and events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detection => "DETECTION",
            Self::DomainDiscovery => "DOMAIN_DISCOVERY",
            Self::Requirements => "REQUIREMENTS",
            Self::TechStack => "TECH_STACK",
            Self::ExecutionPlan => "EXECUTION_PLAN",
        }
    }
}

/// Lifecycle status of one phase execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Type of a generated document; unique per (project, type).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    EventStorming,
    Prd,
    TechStack,
    ExecutionPlan,
}

/// Delivery approach detected for the execution plan.
///
/// `Vertical` (feature-by-feature) is the default whenever classification
/// fails or returns something unexpected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryApproach {
    Horizontal,
    Vertical,
}

impl DeliveryApproach {
    /// Parse a classifier answer, falling back to `Vertical` on anything
    /// that is not exactly HORIZONTAL or VERTICAL.
    #[must_use]
    pub fn from_classifier(raw: &str) -> Self {
        match raw.trim() {
            "HORIZONTAL" => Self::Horizontal,
            "VERTICAL" => Self::Vertical,
            _ => Self::Vertical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_string_forms_round_trip() {
        for phase in [
            WorkflowPhase::Detection,
            WorkflowPhase::DomainDiscovery,
            WorkflowPhase::Requirements,
            WorkflowPhase::TechStack,
            WorkflowPhase::ExecutionPlan,
        ] {
            let parsed: WorkflowPhase = phase.as_str().parse().unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn approach_classifier_defaults_to_vertical() {
        assert_eq!(
            DeliveryApproach::from_classifier("HORIZONTAL"),
            DeliveryApproach::Horizontal
        );
        assert_eq!(
            DeliveryApproach::from_classifier("VERTICAL"),
            DeliveryApproach::Vertical
        );
        assert_eq!(
            DeliveryApproach::from_classifier("DIAGONAL"),
            DeliveryApproach::Vertical
        );
        assert_eq!(
            DeliveryApproach::from_classifier(""),
            DeliveryApproach::Vertical
        );
    }

    #[test]
    fn document_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&DocumentType::TechStack).unwrap();
        assert_eq!(json, "\"TECH_STACK\"");
    }
}
