//! Services layer
//!
//! Orchestration of the compliance workflow on top of the domain ports.

pub mod corpus_loader;
pub mod dataset;
pub mod judge;
pub mod pipeline;
pub mod retrieval;

pub use corpus_loader::{CorpusLoader, LoadSummary};
pub use dataset::{load_queries, parse_records, DatasetFilter, DatasetFormat};
pub use judge::{build_prompt, parse_verdict, ComplianceJudge, SYSTEM_INSTRUCTION};
pub use pipeline::{CompliancePipeline, ProgressCallback};
pub use retrieval::RetrievalPipeline;
