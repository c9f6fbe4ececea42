//! Implementation of the `regcheck ingest` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::context::open_store;
use crate::cli::output::{create_spinner, list_table, output, CommandOutput};
use crate::domain::models::{Config, EmbeddingProgress};
use crate::domain::ports::{CorpusStore, IndexSpec};
use crate::infrastructure::documents::{ChunkingClient, IngestionClient};
use crate::services::{CorpusLoader, LoadSummary};

/// Ingest PDF regulations and load their chunks into the corpus
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// URLs of the PDF regulations to ingest
    #[arg(required_unless_present = "chunks_file")]
    pub urls: Vec<String>,

    /// Load pre-chunked text (JSON array or YAML list of strings) instead of calling the services
    #[arg(long, conflicts_with = "urls")]
    pub chunks_file: Option<PathBuf>,

    /// Build the similarity and lexical indexes after loading
    #[arg(long)]
    pub index: bool,

    /// Wait up to this many seconds for the embedding job to finish
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,
}

/// Result of an `ingest` run.
#[derive(Debug, Serialize)]
pub struct IngestOutput {
    /// Qualified corpus table
    pub table: String,
    /// One summary per source, in command-line order
    pub loads: Vec<LoadSummary>,
    /// Whether `--index` ran
    pub indexes_built: bool,
    /// Embedding progress, when `--wait` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<EmbeddingProgress>,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["source", "chunks", "skipped", "inserted", "ids"]);
        for load in &self.loads {
            table.add_row(vec![
                load.document_url.clone().unwrap_or_else(|| "chunks file".to_string()),
                load.chunks_received.to_string(),
                load.chunks_skipped.to_string(),
                load.inserted.to_string(),
                load.id_range
                    .map_or_else(|| "-".to_string(), |(a, b)| format!("{a}..={b}")),
            ]);
        }

        let inserted: usize = self.loads.iter().map(|l| l.inserted).sum();
        let mut lines = vec![
            format!("Loaded {inserted} chunk(s) into {}", self.table),
            table.to_string(),
        ];
        for load in self.loads.iter().filter(|l| !l.is_complete()) {
            lines.push(format!(
                "WARNING: rows {} are stored but not embedded ({}); run `regcheck embed` instead of re-ingesting",
                load.id_range
                    .map_or_else(|| "-".to_string(), |(a, b)| format!("{a}..={b}")),
                load.embedding_error.as_deref().unwrap_or_default()
            ));
        }
        if self.indexes_built {
            lines.push("Indexes created.".to_string());
        }
        if let Some(progress) = &self.progress {
            lines.push(format!(
                "Embeddings: {}/{} complete",
                progress.embedded, progress.total
            ));
        }
        lines.join("\n")
    }
}

/// Loads every source, then optionally indexes and waits.
pub async fn execute(args: IngestArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await?;
    let result = run(args, config, Arc::clone(&store), json_mode).await;
    store.close().await;
    output(&result?, json_mode);
    Ok(())
}

/// Chunks from a JSON array or, for `.yaml`/`.yml` files, a YAML sequence of strings.
fn parse_chunks_file(path: &Path, content: &str) -> Result<Vec<String>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(content)
            .with_context(|| format!("{} is not a YAML list of strings", path.display())),
        _ => serde_json::from_str(content)
            .with_context(|| format!("{} is not a JSON array of strings", path.display())),
    }
}

async fn run(
    args: IngestArgs,
    config: &Config,
    store: Arc<dyn CorpusStore>,
    json_mode: bool,
) -> Result<IngestOutput> {
    let table = format!("{}.{}", config.corpus.schema, config.corpus.table);
    let loader = CorpusLoader::new(store);
    let mut loads = Vec::new();

    if let Some(path) = &args.chunks_file {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let chunks = parse_chunks_file(path, &content)?;
        let spinner = create_spinner(format!("Loading {} chunks", chunks.len()), json_mode);
        let summary = loader.load_chunks(chunks).await;
        spinner.finish_and_clear();
        loads.push(summary?);
    } else {
        let ingestion = IngestionClient::from_config(&config.ingestion, &config.retry)?;
        let chunking = ChunkingClient::from_config(&config.chunking, &config.retry)?;
        for url in &args.urls {
            let spinner = create_spinner(format!("Ingesting {url}"), json_mode);
            let summary = loader.load_document(&ingestion, &chunking, url).await;
            spinner.finish_and_clear();
            loads.push(summary.with_context(|| format!("Failed to load {url}"))?);
        }
    }

    if args.index {
        let spinner = create_spinner("Building indexes", json_mode);
        let built = loader.build_indexes(&IndexSpec::from_config(config)).await;
        spinner.finish_and_clear();
        built.context("Failed to build indexes")?;
    }

    let progress = match args.wait {
        Some(secs) => {
            let spinner = create_spinner("Waiting for embeddings", json_mode);
            let progress = loader
                .wait_for_embeddings(Duration::from_secs(secs), Duration::from_secs(2))
                .await;
            spinner.finish_and_clear();
            Some(progress?)
        }
        None => None,
    };

    Ok(IngestOutput {
        table,
        loads,
        indexes_built: args.index,
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_file_formats() {
        let json = parse_chunks_file(Path::new("c.json"), r#"["a", "b"]"#).unwrap();
        assert_eq!(json, vec!["a", "b"]);

        let yaml = parse_chunks_file(Path::new("c.yaml"), "- first rule\n- second rule\n").unwrap();
        assert_eq!(yaml, vec!["first rule", "second rule"]);

        assert!(parse_chunks_file(Path::new("c.json"), r#"{"chunks": []}"#).is_err());
    }
}
