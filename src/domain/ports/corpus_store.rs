//! Corpus store port: the table of chunks, its embedding job and its indexes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ComplianceResult;
use crate::domain::models::{
    ComplianceDocument, Config, DistanceMetric, DocumentId, EmbeddingProgress, RetrievalResult,
};

/// Identity of a corpus: where it lives and how it is embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDescriptor {
    /// Postgres schema of the table
    pub schema: String,
    /// Table name
    pub table: String,
    /// Embedding model bound to the table at load time
    pub embedding_model: String,
    /// Fixed vector width of the table
    pub dimension: usize,
    /// Metric used by similarity queries
    pub metric: DistanceMetric,
}

impl CorpusDescriptor {
    /// Descriptor of the configured corpus.
    pub fn from_config(config: &Config) -> Self {
        Self {
            schema: config.corpus.schema.clone(),
            table: config.corpus.table.clone(),
            embedding_model: config.embedding.model.clone(),
            dimension: config.embedding.dimension,
            metric: config.index.metric,
        }
    }
}

/// Parameters of the two indexes built over a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Access method of the ANN index, e.g. `lantern_hnsw`
    pub index_type: String,
    /// Operator class metric
    pub metric: DistanceMetric,
    /// Vector width, must match the corpus
    pub dimension: usize,
    /// HNSW graph degree
    pub m: Option<u32>,
    /// HNSW construction candidate list size
    pub ef_construction: Option<u32>,
    /// HNSW search candidate list size
    pub ef: Option<u32>,
    /// Text search configuration of the lexical index
    pub text_search_config: String,
}

impl IndexSpec {
    /// Index parameters from the `index` config section.
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_type: config.index.index_type.clone(),
            metric: config.index.metric,
            dimension: config.embedding.dimension,
            m: config.index.m,
            ef_construction: config.index.ef_construction,
            ef: config.index.ef,
            text_search_config: config.index.text_search_config.clone(),
        }
    }
}

/// Storage of compliance documents with similarity search.
///
/// Rows move from pending (vector null) to embedded once the embedding job
/// has processed them. Pending rows never appear in `nearest` results.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Identity of the corpus this store serves.
    fn descriptor(&self) -> &CorpusDescriptor;

    /// Creates the table and records the corpus model and dimension.
    ///
    /// A no-op against a compatible existing corpus; a SchemaError when the
    /// recorded model or dimension differ.
    async fn prepare_schema(&self) -> ComplianceResult<()>;

    /// Inserts rows in one transaction. Returns the number inserted.
    async fn insert_documents(&self, documents: &[ComplianceDocument]) -> ComplianceResult<usize>;

    /// Binds the asynchronous embedding process to the `chunk` → `vector` columns.
    ///
    /// Idempotent: an already registered job is kept. Stores that embed
    /// client-side process every pending row before returning.
    async fn register_embedding_job(&self) -> ComplianceResult<()>;

    /// Builds the similarity index over `vector` and the lexical index over `chunk`.
    async fn create_indexes(&self, spec: &IndexSpec) -> ComplianceResult<()>;

    /// Counts of embedded and pending rows.
    async fn embedding_progress(&self) -> ComplianceResult<EmbeddingProgress>;

    /// The `k` embedded rows nearest to `query`, ascending by distance.
    async fn nearest(&self, query: &str, k: usize) -> ComplianceResult<RetrievalResult>;

    /// Number of rows, embedded or not.
    async fn count(&self) -> ComplianceResult<u64>;

    /// Highest row id, `None` for an empty table.
    async fn max_id(&self) -> ComplianceResult<Option<DocumentId>>;

    /// Embedding model recorded when the corpus was created.
    async fn stored_model(&self) -> ComplianceResult<Option<String>>;

    /// Drops the table and its metadata.
    async fn teardown(&self) -> ComplianceResult<()>;

    /// Releases the underlying connections.
    async fn close(&self);
}
