//! Corpus loading: ingestion → chunking → corpus table → embedding job.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{ComplianceDocument, DocumentId, EmbeddingProgress};
use crate::domain::ports::{CorpusStore, IndexSpec};
use crate::infrastructure::documents::{ChunkingClient, IngestionClient};

/// What a single load added to the corpus.
///
/// Rows are committed before the embedding job is registered. A registration
/// failure is carried in `embedding_error` rather than failing the load, so
/// callers never retry an insert that already happened; they call
/// [`CorpusLoader::resume_embedding`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Source PDF, when the chunks came from the ingestion service
    pub document_url: Option<String>,
    /// Markdown rendering returned by the ingestion service
    pub markdown_url: Option<String>,
    /// Chunks handed to the loader
    pub chunks_received: usize,
    /// Whitespace-only chunks dropped before insertion
    pub chunks_skipped: usize,
    /// Rows committed to the corpus table
    pub inserted: usize,
    /// Id range assigned to the inserted rows, inclusive
    pub id_range: Option<(DocumentId, DocumentId)>,
    /// Why the embedding job could not be registered after the insert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
}

impl LoadSummary {
    /// True when the rows are in and the embedding job is registered.
    pub const fn is_complete(&self) -> bool {
        self.embedding_error.is_none()
    }
}

/// Fills a corpus table from source documents.
pub struct CorpusLoader {
    store: Arc<dyn CorpusStore>,
}

impl CorpusLoader {
    /// Loader writing into `store`.
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self { store }
    }

    /// The corpus store being filled.
    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    /// Ingests one PDF, chunks its markdown and loads the chunks.
    #[instrument(skip(self, ingestion, chunking))]
    pub async fn load_document(
        &self,
        ingestion: &IngestionClient,
        chunking: &ChunkingClient,
        document_url: &str,
    ) -> ComplianceResult<LoadSummary> {
        let markdown_url = ingestion.ingest_pdf(document_url).await?;
        let chunks = chunking.chunk(&markdown_url).await?;

        let mut summary = self.load_chunks(chunks).await?;
        summary.document_url = Some(document_url.to_string());
        summary.markdown_url = Some(markdown_url);
        Ok(summary)
    }

    /// Inserts chunks as pending rows and registers the embedding job.
    ///
    /// Ids are sequential in chunk order, starting after the current maximum.
    /// Errors before or during the insert leave the corpus unchanged. Once the
    /// insert commits, a failed registration is reported in
    /// [`LoadSummary::embedding_error`] and the rows stay pending.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn load_chunks(&self, chunks: Vec<String>) -> ComplianceResult<LoadSummary> {
        self.store.prepare_schema().await?;

        let received = chunks.len();
        let kept: Vec<String> = chunks
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();
        let skipped = received - kept.len();
        if skipped > 0 {
            warn!(skipped, "Dropped whitespace-only chunks");
        }

        let first_id = self.store.max_id().await?.map_or(Ok(1), |max| {
            max.checked_add(1)
                .ok_or_else(|| ComplianceError::Data("document id space exhausted".to_string()))
        })?;
        let documents = kept
            .into_iter()
            .enumerate()
            .map(|(offset, chunk)| {
                DocumentId::try_from(offset)
                    .ok()
                    .and_then(|offset| first_id.checked_add(offset))
                    .map(|id| ComplianceDocument::pending(id, chunk))
                    .ok_or_else(|| ComplianceError::Data("document id space exhausted".to_string()))
            })
            .collect::<ComplianceResult<Vec<_>>>()?;

        let inserted = if documents.is_empty() {
            0
        } else {
            self.store.insert_documents(&documents).await?
        };
        let embedding_error = match self.store.register_embedding_job().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, inserted, "Chunks committed but embedding job not registered");
                Some(e.to_string())
            }
        };

        let id_range = documents.first().zip(documents.last()).map(|(a, b)| (a.id, b.id));
        info!(inserted, skipped, ?id_range, "Chunks loaded");
        Ok(LoadSummary {
            document_url: None,
            markdown_url: None,
            chunks_received: received,
            chunks_skipped: skipped,
            inserted,
            id_range,
            embedding_error,
        })
    }

    /// Registers the embedding job for rows already in the corpus.
    ///
    /// Safe to repeat; in client mode this backfills whatever is still pending.
    #[instrument(skip(self))]
    pub async fn resume_embedding(&self) -> ComplianceResult<EmbeddingProgress> {
        self.store.register_embedding_job().await?;
        self.store.embedding_progress().await
    }

    /// Creates the similarity and lexical indexes.
    pub async fn build_indexes(&self, spec: &IndexSpec) -> ComplianceResult<()> {
        self.store.create_indexes(spec).await
    }

    /// Polls embedding progress until no row is pending or `timeout` elapses.
    pub async fn wait_for_embeddings(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ComplianceResult<EmbeddingProgress> {
        let started = Instant::now();
        loop {
            let progress = self.store.embedding_progress().await?;
            if progress.is_complete() {
                return Ok(progress);
            }
            if started.elapsed() >= timeout {
                return Err(ComplianceError::external(
                    "embedding",
                    format!(
                        "{} of {} rows still pending after {}s",
                        progress.pending,
                        progress.total,
                        timeout.as_secs()
                    ),
                ));
            }
            info!(
                embedded = progress.embedded,
                pending = progress.pending,
                "Waiting for embedding job"
            );
            tokio::time::sleep(poll_interval).await;
        }
    }
}
