//! In-memory storage backed by `tokio::sync::RwLock` maps.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use ideaforge_types::{
    DocumentType, GeneratedDocument, PhaseState, Project, UsageRecord,
};

use crate::{Storage, StorageError, UsageTotals};

/// Reference [`Storage`] implementation for tests and single-process runs.
#[derive(Default)]
pub struct MemoryStorage {
    projects: RwLock<HashMap<Uuid, Project>>,
    phase_states: RwLock<HashMap<Uuid, PhaseState>>,
    /// Append-only, in insertion order.
    usage_records: RwLock<Vec<UsageRecord>>,
    documents: RwLock<HashMap<(Uuid, DocumentType), GeneratedDocument>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_project(&self, project: Project) -> Result<(), StorageError> {
        self.projects.write().await.insert(project.id, project);
        Ok(())
    }

    async fn get_project(&self, project_id: Uuid) -> Result<Project, StorageError> {
        self.projects
            .read()
            .await
            .get(&project_id)
            .cloned()
            .ok_or(StorageError::ProjectNotFound(project_id))
    }

    async fn update_project(&self, project: Project) -> Result<(), StorageError> {
        let mut projects = self.projects.write().await;
        if !projects.contains_key(&project.id) {
            return Err(StorageError::ProjectNotFound(project.id));
        }
        projects.insert(project.id, project);
        Ok(())
    }

    async fn insert_phase_state(&self, state: PhaseState) -> Result<(), StorageError> {
        self.phase_states.write().await.insert(state.id, state);
        Ok(())
    }

    async fn update_phase_state(&self, state: PhaseState) -> Result<(), StorageError> {
        let mut states = self.phase_states.write().await;
        if !states.contains_key(&state.id) {
            return Err(StorageError::PhaseStateNotFound(state.id));
        }
        states.insert(state.id, state);
        Ok(())
    }

    async fn list_phase_states(&self, project_id: Uuid) -> Result<Vec<PhaseState>, StorageError> {
        let states = self.phase_states.read().await;
        let mut list: Vec<PhaseState> = states
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        list.sort_by_key(|s| s.started_at);
        Ok(list)
    }

    async fn insert_usage_record(&self, record: UsageRecord) -> Result<(), StorageError> {
        self.usage_records.write().await.push(record);
        Ok(())
    }

    async fn usage_totals(&self, project_id: Uuid) -> Result<UsageTotals, StorageError> {
        let records = self.usage_records.read().await;
        let mut cost_usd = Decimal::ZERO;
        let mut latency_ms = 0u64;
        for record in records.iter().filter(|r| r.project_id == project_id) {
            cost_usd += record.cost_usd;
            latency_ms += record.latency_ms;
        }
        Ok(UsageTotals {
            cost_usd: cost_usd.round_dp(6),
            latency_ms,
        })
    }

    async fn upsert_document(&self, document: GeneratedDocument) -> Result<(), StorageError> {
        let mut documents = self.documents.write().await;
        let key = (document.project_id, document.doc_type);
        match documents.get_mut(&key) {
            Some(existing) => {
                existing.content_md = document.content_md;
                existing.metadata = document.metadata;
                existing.updated_at = Utc::now();
            }
            None => {
                documents.insert(key, document);
            }
        }
        Ok(())
    }

    async fn get_document(
        &self,
        project_id: Uuid,
        doc_type: DocumentType,
    ) -> Result<Option<GeneratedDocument>, StorageError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&(project_id, doc_type))
            .cloned())
    }

    async fn list_documents(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<GeneratedDocument>, StorageError> {
        let documents = self.documents.read().await;
        let mut list: Vec<GeneratedDocument> = documents
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        list.sort_by_key(|d| d.created_at);
        Ok(list)
    }
}
