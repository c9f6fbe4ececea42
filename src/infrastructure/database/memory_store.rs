//! Process-local [`CorpusStore`] with brute-force similarity search.
//!
//! Mirrors the Postgres store's observable behavior (metadata conflicts,
//! duplicate ids, pending rows excluded from search) without a database.
//! Not an index: every query scans every embedded row.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{
    ComplianceDocument, DocumentId, EmbeddingProgress, RetrievalResult, RetrievedChunk,
};
use crate::domain::ports::{CorpusDescriptor, CorpusStore, EmbeddingProvider, IndexSpec};

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<DocumentId, ComplianceDocument>,
    /// `(model, dimension)` recorded by `prepare_schema`
    metadata: Option<(String, usize)>,
    /// Recorded once per corpus, like the metadata table's `embedding_job_id`
    job_id: Option<i32>,
    indexes: Vec<IndexSpec>,
}

/// In-memory corpus for tests and dry runs.
///
/// Registration records a job id the way the Postgres store does, then embeds
/// pending rows through the attached provider.
pub struct MemoryCorpusStore {
    descriptor: CorpusDescriptor,
    embedder: Arc<dyn EmbeddingProvider>,
    state: RwLock<MemoryState>,
    /// Job ids keep counting across teardown, like a serial column
    last_job_id: std::sync::atomic::AtomicI32,
}

impl MemoryCorpusStore {
    /// Empty store; `prepare_schema` records `descriptor` as its metadata.
    pub fn new(descriptor: CorpusDescriptor, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            descriptor,
            embedder,
            state: RwLock::new(MemoryState::default()),
            last_job_id: std::sync::atomic::AtomicI32::new(0),
        }
    }

    /// Id of the registered embedding job, if any.
    pub async fn embedding_job_id(&self) -> Option<i32> {
        self.state.read().await.job_id
    }

    /// Indexes requested so far, in creation order.
    pub async fn indexes(&self) -> Vec<IndexSpec> {
        self.state.read().await.indexes.clone()
    }

    async fn embed_pending(&self, state: &mut MemoryState) -> ComplianceResult<()> {
        let pending: Vec<(DocumentId, String)> = state
            .rows
            .values()
            .filter(|row| row.vector.is_none())
            .map(|row| (row.id, row.chunk.clone()))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = pending.iter().map(|(_, chunk)| chunk.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.descriptor.dimension) {
            return Err(ComplianceError::Data(format!(
                "embedding provider returned {} dimensions, corpus expects {}",
                bad.len(),
                self.descriptor.dimension
            )));
        }
        for ((id, _), vector) in pending.into_iter().zip(vectors) {
            if let Some(row) = state.rows.get_mut(&id) {
                row.vector = Some(vector);
            }
        }
        debug!(rows = texts.len(), "Embedded pending rows");
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpusStore {
    fn descriptor(&self) -> &CorpusDescriptor {
        &self.descriptor
    }

    async fn prepare_schema(&self) -> ComplianceResult<()> {
        let mut state = self.state.write().await;
        let wanted = (
            self.descriptor.embedding_model.clone(),
            self.descriptor.dimension,
        );
        match &state.metadata {
            Some(recorded) if *recorded != wanted => Err(ComplianceError::Schema(format!(
                "corpus {} was created with model '{}' ({} dimensions)",
                self.descriptor.table, recorded.0, recorded.1
            ))),
            Some(_) => Ok(()),
            None => {
                state.metadata = Some(wanted);
                Ok(())
            }
        }
    }

    async fn insert_documents(&self, documents: &[ComplianceDocument]) -> ComplianceResult<usize> {
        let mut state = self.state.write().await;
        if state.metadata.is_none() {
            return Err(ComplianceError::Schema(format!(
                "corpus table {} does not exist",
                self.descriptor.table
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for document in documents {
            document.check_dimension(self.descriptor.dimension)?;
            if state.rows.contains_key(&document.id) || !seen.insert(document.id) {
                return Err(ComplianceError::Schema(format!(
                    "duplicate document id {}",
                    document.id
                )));
            }
        }

        for document in documents {
            state.rows.insert(document.id, document.clone());
        }
        // A live job embeds new rows on its own; failures leave them pending
        if state.job_id.is_some() {
            if let Err(e) = self.embed_pending(&mut state).await {
                warn!(error = %e, "Embedding new rows failed; rows left pending");
            }
        }
        Ok(documents.len())
    }

    async fn register_embedding_job(&self) -> ComplianceResult<()> {
        let mut state = self.state.write().await;
        if state.metadata.is_none() {
            return Err(ComplianceError::Schema(format!(
                "corpus {} has no metadata; prepare the schema first",
                self.descriptor.table
            )));
        }
        match state.job_id {
            Some(job_id) => debug!(job_id, "Embedding job already registered"),
            None => {
                let job_id = self
                    .last_job_id
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                    + 1;
                state.job_id = Some(job_id);
                debug!(job_id, "Embedding job registered");
            }
        }
        self.embed_pending(&mut state).await
    }

    async fn create_indexes(&self, spec: &IndexSpec) -> ComplianceResult<()> {
        if spec.dimension != self.descriptor.dimension {
            return Err(ComplianceError::Schema(format!(
                "index dimension {} does not match corpus dimension {}",
                spec.dimension, self.descriptor.dimension
            )));
        }
        let mut state = self.state.write().await;
        if !state.indexes.contains(spec) {
            state.indexes.push(spec.clone());
        }
        Ok(())
    }

    async fn embedding_progress(&self) -> ComplianceResult<EmbeddingProgress> {
        let state = self.state.read().await;
        let embedded = state.rows.values().filter(|r| r.vector.is_some()).count();
        Ok(EmbeddingProgress::new(
            state.rows.len() as u64,
            embedded as u64,
        ))
    }

    async fn nearest(&self, query: &str, k: usize) -> ComplianceResult<RetrievalResult> {
        let state = self.state.read().await;
        if k == 0 || state.rows.values().all(|r| r.vector.is_none()) {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != self.descriptor.dimension {
            return Err(ComplianceError::Data(format!(
                "query vector has {} dimensions, corpus expects {}",
                query_vector.len(),
                self.descriptor.dimension
            )));
        }

        let metric = self.descriptor.metric;
        let mut scored: Vec<RetrievedChunk> = state
            .rows
            .values()
            .filter_map(|row| {
                row.vector.as_ref().map(|vector| RetrievedChunk {
                    id: row.id,
                    chunk: row.chunk.clone(),
                    distance: metric.distance(vector, &query_vector),
                })
            })
            .collect();
        // Stable sort keeps id order among equal distances
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> ComplianceResult<u64> {
        Ok(self.state.read().await.rows.len() as u64)
    }

    async fn max_id(&self) -> ComplianceResult<Option<DocumentId>> {
        Ok(self.state.read().await.rows.keys().next_back().copied())
    }

    async fn stored_model(&self) -> ComplianceResult<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .metadata
            .as_ref()
            .map(|(model, _)| model.clone()))
    }

    async fn teardown(&self) -> ComplianceResult<()> {
        *self.state.write().await = MemoryState::default();
        Ok(())
    }

    async fn close(&self) {}
}
