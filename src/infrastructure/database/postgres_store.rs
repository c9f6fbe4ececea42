//! Postgres implementation of [`CorpusStore`].

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::connection::DatabaseConnection;
use super::errors::{is_undefined_table, map_ddl_error, map_query_error};
use super::sql::{self, TableName};
use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{
    ComplianceDocument, DocumentId, EmbeddingMode, EmbeddingProgress, RetrievalResult,
    RetrievedChunk,
};
use crate::domain::ports::{CorpusDescriptor, CorpusStore, EmbeddingProvider, IndexSpec};

/// Corpus table in Postgres with an embedding-capable extension.
///
/// In [`EmbeddingMode::Database`] the extension embeds rows and queries
/// (`add_embedding_job`, `text_embedding`). In [`EmbeddingMode::Client`] the
/// attached [`EmbeddingProvider`] does, and vectors are written by this store.
pub struct PostgresCorpusStore {
    connection: DatabaseConnection,
    table: TableName,
    descriptor: CorpusDescriptor,
    mode: EmbeddingMode,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl PostgresCorpusStore {
    /// Store embedding inside the database.
    pub fn new(connection: DatabaseConnection, descriptor: CorpusDescriptor) -> ComplianceResult<Self> {
        let table = TableName::new(&descriptor.schema, &descriptor.table)?;
        Ok(Self {
            connection,
            table,
            descriptor,
            mode: EmbeddingMode::Database,
            embedder: None,
        })
    }

    /// Store embedding through a client-side provider.
    pub fn with_embedder(
        connection: DatabaseConnection,
        descriptor: CorpusDescriptor,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> ComplianceResult<Self> {
        if embedder.dimension() != descriptor.dimension {
            return Err(ComplianceError::Config(format!(
                "embedding provider produces {} dimensions, corpus expects {}",
                embedder.dimension(),
                descriptor.dimension
            )));
        }
        let mut store = Self::new(connection, descriptor)?;
        store.mode = EmbeddingMode::Client;
        store.embedder = Some(embedder);
        Ok(store)
    }

    /// Where embeddings are computed for this store.
    pub const fn mode(&self) -> EmbeddingMode {
        self.mode
    }

    fn pool(&self) -> &PgPool {
        self.connection.pool()
    }

    fn embedder(&self) -> ComplianceResult<&Arc<dyn EmbeddingProvider>> {
        self.embedder.as_ref().ok_or_else(|| {
            ComplianceError::Config("client embedding mode requires an embedding provider".to_string())
        })
    }

    /// Embeds and writes every pending row, one batch per transaction.
    async fn backfill_vectors(&self) -> ComplianceResult<u64> {
        let embedder = self.embedder()?;
        let batch_size = i64::try_from(embedder.max_batch_size()).unwrap_or(i64::MAX);
        let select = sql::select_pending(&self.table);
        let update = sql::update_vector(&self.table);
        let mut written = 0_u64;

        loop {
            let pending: Vec<(DocumentId, String)> = sqlx::query_as(&select)
                .bind(batch_size)
                .fetch_all(self.pool())
                .await
                .map_err(|e| map_query_error(e, "select pending rows"))?;
            if pending.is_empty() {
                break;
            }

            let texts: Vec<String> = pending.iter().map(|(_, chunk)| chunk.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;

            let mut tx = self
                .pool()
                .begin()
                .await
                .map_err(|e| map_query_error(e, "begin transaction"))?;
            for ((id, _), vector) in pending.iter().zip(vectors) {
                sqlx::query(&update)
                    .bind(id)
                    .bind(vector)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_query_error(e, "write vector"))?;
            }
            tx.commit()
                .await
                .map_err(|e| map_query_error(e, "commit vectors"))?;

            written += pending.len() as u64;
            debug!(written, "Embedded pending rows");
        }
        Ok(written)
    }
}

#[async_trait]
impl CorpusStore for PostgresCorpusStore {
    fn descriptor(&self) -> &CorpusDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self), fields(table = %self.table.key()))]
    async fn prepare_schema(&self) -> ComplianceResult<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_query_error(e, "begin transaction"))?;

        sqlx::query(&sql::create_meta_table())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(e, "create metadata table"))?;

        let recorded: Option<(String, i32, Option<i32>)> = sqlx::query_as(&sql::select_metadata())
            .bind(self.table.key())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_query_error(e, "read corpus metadata"))?;

        let dimension = i32::try_from(self.descriptor.dimension)
            .map_err(|_| ComplianceError::Config("embedding dimension too large".to_string()))?;

        match recorded {
            Some((model, dim, _)) if model != self.descriptor.embedding_model || dim != dimension => {
                return Err(ComplianceError::Schema(format!(
                    "corpus {} was created with model '{model}' ({dim} dimensions), configured '{}' ({} dimensions)",
                    self.table.key(),
                    self.descriptor.embedding_model,
                    self.descriptor.dimension
                )));
            }
            Some(_) => debug!("Corpus metadata already recorded"),
            None => {
                sqlx::query(&sql::insert_metadata())
                    .bind(self.table.key())
                    .bind(&self.descriptor.embedding_model)
                    .bind(dimension)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_ddl_error(e, "record corpus metadata"))?;
            }
        }

        sqlx::query(&sql::create_corpus_table(&self.table, self.descriptor.dimension))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(e, "create corpus table"))?;

        tx.commit()
            .await
            .map_err(|e| map_query_error(e, "commit schema"))?;
        info!("Corpus schema ready");
        Ok(())
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn insert_documents(&self, documents: &[ComplianceDocument]) -> ComplianceResult<usize> {
        for document in documents {
            document.check_dimension(self.descriptor.dimension)?;
        }

        let statement = sql::insert_document(&self.table);
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_query_error(e, "begin transaction"))?;
        for document in documents {
            sqlx::query(&statement)
                .bind(document.id)
                .bind(&document.chunk)
                .bind(document.vector.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_query_error(e, &format!("insert document {}", document.id)))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_query_error(e, "commit documents"))?;

        info!(inserted = documents.len(), "Documents inserted");
        Ok(documents.len())
    }

    #[instrument(skip(self), fields(table = %self.table.key(), mode = ?self.mode))]
    async fn register_embedding_job(&self) -> ComplianceResult<()> {
        match self.mode {
            EmbeddingMode::Database => {
                let mut tx = self
                    .pool()
                    .begin()
                    .await
                    .map_err(|e| map_query_error(e, "begin transaction"))?;
                let recorded: Option<(String, i32, Option<i32>)> =
                    sqlx::query_as(&sql::select_metadata())
                        .bind(self.table.key())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| map_query_error(e, "read corpus metadata"))?;

                match recorded {
                    None => {
                        return Err(ComplianceError::Schema(format!(
                            "corpus {} has no metadata; prepare the schema first",
                            self.table.key()
                        )));
                    }
                    Some((_, _, Some(job_id))) => {
                        debug!(job_id, "Embedding job already registered");
                        return Ok(());
                    }
                    Some((_, _, None)) => {}
                }

                let (job_id,): (i32,) = sqlx::query_as(sql::add_embedding_job())
                    .bind(self.table.qualified())
                    .bind(&self.descriptor.embedding_model)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| map_ddl_error(e, "register embedding job"))?;
                sqlx::query(&sql::record_embedding_job())
                    .bind(self.table.key())
                    .bind(job_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_query_error(e, "record embedding job"))?;
                tx.commit()
                    .await
                    .map_err(|e| map_query_error(e, "commit embedding job"))?;
                info!(job_id, model = %self.descriptor.embedding_model, "Embedding job registered");
            }
            EmbeddingMode::Client => {
                let written = self.backfill_vectors().await?;
                info!(written, "Embedded corpus client-side");
            }
        }
        Ok(())
    }

    #[instrument(skip(self, spec), fields(index_type = %spec.index_type, metric = %spec.metric))]
    async fn create_indexes(&self, spec: &IndexSpec) -> ComplianceResult<()> {
        if spec.dimension != self.descriptor.dimension {
            return Err(ComplianceError::Schema(format!(
                "index dimension {} does not match corpus dimension {}",
                spec.dimension, self.descriptor.dimension
            )));
        }
        if spec.metric != self.descriptor.metric {
            warn!(
                index = %spec.metric,
                queries = %self.descriptor.metric,
                "Index metric differs from query metric; the index will not be used"
            );
        }

        sqlx::query(&sql::create_ann_index(&self.table, spec))
            .execute(self.pool())
            .await
            .map_err(|e| map_ddl_error(e, "create similarity index"))?;
        sqlx::query(&sql::create_lexical_index(&self.table, &spec.text_search_config))
            .execute(self.pool())
            .await
            .map_err(|e| map_ddl_error(e, "create lexical index"))?;

        info!("Indexes created");
        Ok(())
    }

    async fn embedding_progress(&self) -> ComplianceResult<EmbeddingProgress> {
        let (total, embedded): (i64, i64) = sqlx::query_as(&sql::embedding_progress(&self.table))
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_query_error(e, "embedding progress"))?;
        Ok(EmbeddingProgress::new(
            u64::try_from(total).unwrap_or_default(),
            u64::try_from(embedded).unwrap_or_default(),
        ))
    }

    #[instrument(skip(self, query))]
    async fn nearest(&self, query: &str, k: usize) -> ComplianceResult<RetrievalResult> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(k).unwrap_or(i64::MAX);

        let rows: Vec<(DocumentId, String, f64)> = match self.mode {
            EmbeddingMode::Database => {
                sqlx::query_as(&sql::nearest_by_text(&self.table, self.descriptor.metric))
                    .bind(&self.descriptor.embedding_model)
                    .bind(query)
                    .bind(limit)
                    .fetch_all(self.pool())
                    .await
            }
            EmbeddingMode::Client => {
                let vector = self.embedder()?.embed(query).await?;
                if vector.len() != self.descriptor.dimension {
                    return Err(ComplianceError::Data(format!(
                        "query vector has {} dimensions, corpus expects {}",
                        vector.len(),
                        self.descriptor.dimension
                    )));
                }
                sqlx::query_as(&sql::nearest_by_vector(&self.table, self.descriptor.metric))
                    .bind(vector)
                    .bind(limit)
                    .fetch_all(self.pool())
                    .await
            }
        }
        .map_err(|e| map_query_error(e, "similarity search"))?;

        debug!(rows = rows.len(), "Similarity search complete");
        Ok(rows
            .into_iter()
            .map(|(id, chunk, distance)| RetrievedChunk { id, chunk, distance })
            .collect())
    }

    async fn count(&self) -> ComplianceResult<u64> {
        let (count,): (i64,) = sqlx::query_as(&sql::count_rows(&self.table))
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_query_error(e, "count documents"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn max_id(&self) -> ComplianceResult<Option<DocumentId>> {
        let (max,): (Option<DocumentId>,) = sqlx::query_as(&sql::max_id(&self.table))
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_query_error(e, "max document id"))?;
        Ok(max)
    }

    async fn stored_model(&self) -> ComplianceResult<Option<String>> {
        let result: Result<Option<(String, i32, Option<i32>)>, sqlx::Error> =
            sqlx::query_as(&sql::select_metadata())
                .bind(self.table.key())
                .fetch_optional(self.pool())
                .await;

        match result {
            Ok(row) => Ok(row.map(|(model, _, _)| model)),
            Err(e) if is_undefined_table(&e) => Ok(None),
            Err(e) => Err(map_query_error(e, "read corpus metadata")),
        }
    }

    #[instrument(skip(self), fields(table = %self.table.key()))]
    async fn teardown(&self) -> ComplianceResult<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_query_error(e, "begin transaction"))?;
        sqlx::query(&sql::create_meta_table())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(e, "create metadata table"))?;

        let recorded: Option<(String, i32, Option<i32>)> = sqlx::query_as(&sql::select_metadata())
            .bind(self.table.key())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_query_error(e, "read corpus metadata"))?;
        // The job must go before the table it is bound to
        if let Some((_, _, Some(job_id))) = recorded {
            sqlx::query(sql::cancel_embedding_job())
                .bind(job_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_ddl_error(e, "cancel embedding job"))?;
            info!(job_id, "Embedding job cancelled");
        }

        sqlx::query(&sql::drop_corpus_table(&self.table))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_ddl_error(e, "drop corpus table"))?;
        sqlx::query(&sql::delete_metadata())
            .bind(self.table.key())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_query_error(e, "delete corpus metadata"))?;
        tx.commit()
            .await
            .map_err(|e| map_query_error(e, "commit teardown"))?;

        info!("Corpus dropped");
        Ok(())
    }

    async fn close(&self) {
        self.connection.close().await;
    }
}
