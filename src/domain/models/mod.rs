//! Domain models

pub mod config;
pub mod document;
pub mod query;
pub mod retrieval;
pub mod verdict;

pub use config::{
    Config, CorpusConfig, DatabaseConfig, EmbeddingConfig, EmbeddingMode,
    IndexConfig, JudgeConfig, LlmConfig, LlmProviderKind, LoggingConfig, PipelineConfig,
    RateLimitConfig, RetrievalConfig, RetryConfig, ServiceEndpointConfig,
};
pub use document::{ComplianceDocument, DocumentId, EmbeddingProgress, EmbeddingState};
pub use query::{DatasetRecord, Query};
pub use retrieval::{DistanceMetric, RetrievalResult, RetrievedChunk};
pub use verdict::{
    ComplianceReport, ComplianceVerdict, Evaluation, OutcomeStatus, QueryOutcome, Verdict,
};
