//! Implementation of the `regcheck judge` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

use crate::cli::context::open_store;
use crate::cli::output::{create_spinner, output, truncate, CommandOutput};
use crate::domain::errors::ComplianceResult;
use crate::domain::models::{Config, OutcomeStatus, Query, QueryOutcome};
use crate::domain::ports::CorpusStore;
use crate::infrastructure::llm::create_llm_client;
use crate::services::{ComplianceJudge, CompliancePipeline, RetrievalPipeline};

/// Judge a single chat message
#[derive(Args, Debug)]
pub struct JudgeArgs {
    /// Chat message to check
    pub message: String,

    /// Number of chunks to retrieve (defaults to retrieval.top_k)
    #[arg(short, long)]
    pub k: Option<usize>,
}

/// Outcome of judging one message.
#[derive(Debug, Serialize)]
pub struct JudgeOutput {
    /// Verdict and the chunks it was based on
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

impl CommandOutput for JudgeOutput {
    fn to_human(&self) -> String {
        let verdict = match &self.outcome.status {
            OutcomeStatus::Judged { verdict } if verdict.is_compliant() => "COMPLIANT".to_string(),
            OutcomeStatus::Judged { .. } => "NON-COMPLIANT".to_string(),
            OutcomeStatus::Unparseable { raw } => format!("UNPARSEABLE ({raw:?})"),
            OutcomeStatus::Failed { kind, message } => format!("FAILED [{kind}]: {message}"),
        };
        let mut lines = vec![verdict, "Evidence:".to_string()];
        for chunk in &self.outcome.retrieved {
            lines.push(format!(
                "  [{}] {:.4}  {}",
                chunk.id,
                chunk.distance,
                truncate(&chunk.chunk, 100)
            ));
        }
        lines.join("\n")
    }
}

/// Retrieval depth for a judged run: the `-k` override, else `retrieval.top_k`.
///
/// Rejects a depth below `judge.min_chunks`, which would fail every query.
pub fn effective_k(config: &Config, k: Option<usize>) -> Result<usize> {
    let k = k.unwrap_or(config.retrieval.top_k);
    anyhow::ensure!(k >= 1, "-k must be at least 1");
    anyhow::ensure!(
        k >= config.judge.min_chunks,
        "-k {k} is below judge.min_chunks ({})",
        config.judge.min_chunks
    );
    Ok(k)
}

/// Builds the retrieve → judge pipeline for a store.
pub fn build_pipeline(
    store: Arc<dyn CorpusStore>,
    config: &Config,
    k: usize,
) -> ComplianceResult<CompliancePipeline> {
    let retrieval = RetrievalPipeline::new(store, k, &config.embedding.model)?;
    let judge = ComplianceJudge::new(create_llm_client(config)?, &config.judge, &config.llm);
    Ok(CompliancePipeline::new(
        Arc::new(retrieval),
        Arc::new(judge),
        &config.pipeline,
    ))
}

async fn judge_one(
    store: Arc<dyn CorpusStore>,
    config: &Config,
    k: usize,
    message: String,
) -> ComplianceResult<QueryOutcome> {
    let pipeline = build_pipeline(store, config, k)?;
    pipeline.retrieval().verify_model().await?;
    Ok(pipeline.check(Query::new(message)).await)
}

/// Judges one message and prints the verdict with its evidence.
pub async fn execute(args: JudgeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let k = effective_k(config, args.k)?;
    let store = open_store(config).await?;

    let spinner = create_spinner("Judging message", json_mode);
    let result = judge_one(Arc::clone(&store), config, k, args.message).await;
    spinner.finish_and_clear();
    store.close().await;

    output(&JudgeOutput { outcome: result? }, json_mode);
    Ok(())
}
