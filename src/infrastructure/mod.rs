//! Infrastructure layer
//!
//! Adapters implementing the domain ports against external systems:
//! - HTTP plumbing shared by every service client
//! - Document ingestion and chunking clients
//! - LLM and embedding API clients
//! - Postgres and in-memory corpus stores
//! - Configuration loading and logging

pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod http;
pub mod llm;
pub mod logging;
