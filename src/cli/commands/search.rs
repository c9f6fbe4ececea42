//! Implementation of the `regcheck search` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use crate::cli::context::open_store;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{Config, RetrievalResult};
use crate::services::RetrievalPipeline;

/// Retrieve the chunks nearest to a text
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to search for
    pub query: String,

    /// Number of chunks to return (defaults to retrieval.top_k)
    #[arg(short, long)]
    pub k: Option<usize>,
}

/// Nearest chunks for a query.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    /// Text that was searched
    pub query: String,
    /// Requested depth
    pub k: usize,
    /// Hits, nearest first
    pub results: RetrievalResult,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return "No embedded chunks found.".to_string();
        }
        let mut table = list_table(&["rank", "id", "distance", "chunk"]);
        for (rank, hit) in self.results.iter().enumerate() {
            table.add_row(vec![
                (rank + 1).to_string(),
                hit.id.to_string(),
                format!("{:.4}", hit.distance),
                truncate(&hit.chunk, 80),
            ]);
        }
        table.to_string()
    }
}

/// Prints the nearest chunks for a text.
pub async fn execute(args: SearchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let k = args.k.unwrap_or(config.retrieval.top_k);
    let store = open_store(config).await?;
    let result = match RetrievalPipeline::new(Arc::clone(&store), k, &config.embedding.model) {
        Ok(retrieval) => retrieval.retrieve(&args.query).await,
        Err(err) => Err(err),
    };
    store.close().await;

    output(
        &SearchOutput {
            query: args.query,
            k,
            results: result?,
        },
        json_mode,
    );
    Ok(())
}
