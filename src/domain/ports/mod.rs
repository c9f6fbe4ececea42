//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - CorpusStore: corpus table, embedding job, indexes and similarity search
//! - EmbeddingProvider: text to vector conversion
//! - LlmClient: chat completion used by the compliance judge
//!
//! These traits let the retrieval and judgment services run against Postgres
//! and hosted APIs in production, and against in-process doubles in tests.

pub mod corpus_store;
pub mod embedding;
pub mod llm;

pub use corpus_store::{CorpusDescriptor, CorpusStore, IndexSpec};
pub use embedding::EmbeddingProvider;
pub use llm::{CompletionRequest, LlmClient};
