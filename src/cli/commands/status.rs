//! Implementation of the `regcheck status` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::open_store;
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::ComplianceResult;
use crate::domain::models::{Config, EmbeddingMode, EmbeddingProgress};
use crate::domain::ports::CorpusStore;

/// Show corpus size, embedding progress and model
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Corpus state reported by `status`.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    /// Qualified corpus table
    pub table: String,
    /// Where embeddings are computed
    pub mode: EmbeddingMode,
    /// Model named in configuration
    pub configured_model: String,
    /// Model recorded when the corpus was created
    pub stored_model: Option<String>,
    /// Configured vector width
    pub dimension: usize,
    /// Embedded and pending row counts
    pub progress: EmbeddingProgress,
    /// Highest document id, if any rows exist
    pub max_id: Option<i32>,
}

impl StatusOutput {
    /// False only when a recorded model differs from the configured one.
    pub fn model_matches(&self) -> bool {
        self.stored_model
            .as_deref()
            .map_or(true, |stored| stored == self.configured_model)
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Corpus:     {}", self.table),
            format!(
                "Mode:       {}",
                match self.mode {
                    EmbeddingMode::Database => "database",
                    EmbeddingMode::Client => "client",
                }
            ),
            format!(
                "Model:      {} ({} dimensions)",
                self.stored_model.as_deref().unwrap_or("(not recorded)"),
                self.dimension
            ),
            format!(
                "Documents:  {} total, {} embedded, {} pending",
                self.progress.total, self.progress.embedded, self.progress.pending
            ),
        ];
        if !self.model_matches() {
            lines.push(format!(
                "WARNING: configured embedding model is {}; queries will be rejected",
                self.configured_model
            ));
        }
        lines.join("\n")
    }
}

async fn collect(store: &dyn CorpusStore, config: &Config) -> ComplianceResult<StatusOutput> {
    let stored_model = store.stored_model().await?;
    let progress = store.embedding_progress().await?;
    let max_id = store.max_id().await?;
    Ok(StatusOutput {
        table: format!("{}.{}", config.corpus.schema, config.corpus.table),
        mode: config.embedding.mode,
        configured_model: config.embedding.model.clone(),
        stored_model,
        dimension: config.embedding.dimension,
        progress,
        max_id,
    })
}

/// Prints corpus size, embedding progress and model.
pub async fn execute(_args: StatusArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await?;
    let result = collect(store.as_ref(), config).await;
    store.close().await;
    output(&result?, json_mode);
    Ok(())
}
