//! Implementation of the `regcheck embed` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use crate::cli::context::open_store;
use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::domain::models::{Config, EmbeddingProgress};
use crate::services::CorpusLoader;

/// Register the embedding job for rows left pending by an earlier ingest
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Wait up to this many seconds for pending rows to be embedded
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,
}

/// Embedding progress after registration.
#[derive(Debug, Serialize)]
pub struct EmbedOutput {
    /// Qualified corpus table
    pub table: String,
    /// Row counts once registration returned
    pub progress: EmbeddingProgress,
}

impl CommandOutput for EmbedOutput {
    fn to_human(&self) -> String {
        format!(
            "Embedding job registered on {}: {}/{} rows embedded, {} pending",
            self.table, self.progress.embedded, self.progress.total, self.progress.pending
        )
    }
}

/// Registers the embedding job for rows a previous ingest left pending.
pub async fn execute(args: EmbedArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await?;
    let loader = CorpusLoader::new(store.clone());

    let spinner = create_spinner("Registering embedding job", json_mode);
    let mut result = loader.resume_embedding().await;
    if let (Ok(_), Some(secs)) = (&result, args.wait) {
        result = loader
            .wait_for_embeddings(Duration::from_secs(secs), Duration::from_secs(2))
            .await;
    }
    spinner.finish_and_clear();
    store.close().await;

    let progress = result.context("Failed to embed pending rows")?;
    output(
        &EmbedOutput {
            table: format!("{}.{}", config.corpus.schema, config.corpus.table),
            progress,
        },
        json_mode,
    );
    Ok(())
}
