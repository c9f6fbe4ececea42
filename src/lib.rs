//! regcheck: compliance checking of chat messages against regulatory documents
//!
//! Regulations are ingested and chunked by external services, stored in a
//! Postgres corpus table embedded by an asynchronous job, and searched by
//! similarity. Each message is judged by an LLM against its nearest chunks.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{ComplianceError, ComplianceResult, ErrorKind};
pub use domain::models::{
    ComplianceDocument, ComplianceReport, ComplianceVerdict, Config, Query, QueryOutcome,
    RetrievedChunk, Verdict,
};
pub use domain::ports::{CorpusStore, EmbeddingProvider, LlmClient};
pub use services::{CorpusLoader, CompliancePipeline, ComplianceJudge, RetrievalPipeline};
