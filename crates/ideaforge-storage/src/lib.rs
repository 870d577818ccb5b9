//! Storage collaborator for the workflow core.
//!
//! The engine only needs CRUD for the four entities, upsert-by-(project,
//! type) for documents, and project-scoped aggregate sums for cost/latency.
//! [`MemoryStorage`] is the reference implementation; a relational backend
//! would implement [`Storage`] the same way.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use ideaforge_types::{
    DocumentType, GeneratedDocument, PhaseState, Project, UsageRecord,
};

/// Errors surfaced by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("phase state {0} not found")]
    PhaseStateNotFound(Uuid),
}

/// Aggregate cost/latency totals for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageTotals {
    /// Sum of all usage-record costs, 6-decimal precision.
    pub cost_usd: Decimal,
    /// Sum of all usage-record latencies in milliseconds.
    pub latency_ms: u64,
}

/// Persistence contract the engine and runner depend on.
///
/// Every write must be durable before it returns; the engine commits state
/// after each phase so a crash mid-run leaves state consistent as of the
/// last completed phase.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_project(&self, project: Project) -> Result<(), StorageError>;

    async fn get_project(&self, project_id: Uuid) -> Result<Project, StorageError>;

    /// Replace the stored project row with the given value.
    async fn update_project(&self, project: Project) -> Result<(), StorageError>;

    async fn insert_phase_state(&self, state: PhaseState) -> Result<(), StorageError>;

    /// Replace the stored phase-state row with the given value.
    async fn update_phase_state(&self, state: PhaseState) -> Result<(), StorageError>;

    /// All phase-state rows for a project, oldest attempt first.
    async fn list_phase_states(&self, project_id: Uuid) -> Result<Vec<PhaseState>, StorageError>;

    async fn insert_usage_record(&self, record: UsageRecord) -> Result<(), StorageError>;

    /// Project-scoped sums over all usage records.
    async fn usage_totals(&self, project_id: Uuid) -> Result<UsageTotals, StorageError>;

    /// Insert or overwrite the document of this type for this project.
    async fn upsert_document(&self, document: GeneratedDocument) -> Result<(), StorageError>;

    async fn get_document(
        &self,
        project_id: Uuid,
        doc_type: DocumentType,
    ) -> Result<Option<GeneratedDocument>, StorageError>;

    /// All documents for a project, oldest first.
    async fn list_documents(&self, project_id: Uuid) -> Result<Vec<GeneratedDocument>, StorageError>;
}
