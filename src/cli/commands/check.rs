//! Implementation of the `regcheck check` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::judge::{build_pipeline, effective_k};
use crate::cli::context::open_store;
use crate::cli::output::{create_progress_bar, list_table, output, truncate, CommandOutput};
use crate::domain::errors::ComplianceResult;
use crate::domain::models::{ComplianceReport, Config, OutcomeStatus, Query, QueryOutcome};
use crate::domain::ports::CorpusStore;
use crate::infrastructure::config::MAX_CONCURRENCY;
use crate::services::{load_queries, DatasetFilter};

/// Judge every message in a dataset and report the non-compliant ones
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Dataset of chat messages (.jsonl, .ndjson, .json or .csv)
    pub dataset: PathBuf,

    /// Only check messages from this speaker role
    #[arg(long)]
    pub role: Option<String>,

    /// Check at most this many messages
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of chunks to retrieve per message (defaults to retrieval.top_k)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Messages processed concurrently (defaults to pipeline.concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort on the first message that cannot be judged
    #[arg(long)]
    pub fail_fast: bool,

    /// Also write the full JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Report printed by `check`.
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    /// Full run report
    #[serde(flatten)]
    pub report: ComplianceReport,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut table = list_table(&["id", "verdict", "top chunk", "message"]);
        for outcome in &report.outcomes {
            let verdict = match &outcome.status {
                OutcomeStatus::Judged { verdict } if verdict.is_compliant() => "compliant".to_string(),
                OutcomeStatus::Judged { .. } => "NON-COMPLIANT".to_string(),
                OutcomeStatus::Unparseable { .. } => "unparseable".to_string(),
                OutcomeStatus::Failed { kind, .. } => format!("failed ({kind})"),
            };
            table.add_row(vec![
                outcome.query.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                verdict,
                outcome
                    .retrieved
                    .first()
                    .map_or_else(|| "-".to_string(), |c| c.id.to_string()),
                truncate(&outcome.query.text, 70),
            ]);
        }

        let mut lines = vec![
            table.to_string(),
            format!(
                "\n{} message(s): {} judged, {} non-compliant, {} without verdict",
                report.outcomes.len(),
                report.verdicts().len(),
                report.non_compliant().len(),
                report.failures().len()
            ),
        ];
        if let Some(eval) = report.evaluation() {
            let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0));
            lines.push(format!(
                "Against ground truth: accuracy {}, precision {}, recall {} (tp {}, fp {}, tn {}, fn {}, unjudged {})",
                pct(eval.accuracy()),
                pct(eval.precision()),
                pct(eval.recall()),
                eval.true_positives,
                eval.false_positives,
                eval.true_negatives,
                eval.false_negatives,
                eval.unjudged
            ));
        }
        lines.join("\n")
    }
}

async fn run(
    store: Arc<dyn CorpusStore>,
    config: &Config,
    k: usize,
    queries: Vec<Query>,
    json_mode: bool,
) -> ComplianceResult<ComplianceReport> {
    let progress = create_progress_bar(queries.len() as u64, json_mode);
    let bar = progress.clone();
    let pipeline = build_pipeline(store, config, k)?
        .with_progress(Arc::new(move |_: &QueryOutcome| bar.inc(1)));
    let report = pipeline.run(queries).await;
    progress.finish_and_clear();
    report
}

/// Loads the dataset, runs the pipeline and prints the report.
pub async fn execute(args: CheckArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(concurrency) = args.concurrency {
        anyhow::ensure!(
            (1..=MAX_CONCURRENCY).contains(&concurrency),
            "--concurrency must be between 1 and {MAX_CONCURRENCY}"
        );
        config.pipeline.concurrency = concurrency;
    }
    config.pipeline.fail_fast |= args.fail_fast;
    let k = effective_k(&config, args.k)?;

    let filter = DatasetFilter {
        speaker_role: args.role,
        limit: args.limit,
    };
    let queries = load_queries(&args.dataset, &filter)
        .await
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;

    let store = open_store(&config).await?;
    let result = run(Arc::clone(&store), &config, k, queries, json_mode).await;
    store.close().await;
    let report = result.context("Compliance check failed")?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    output(&CheckOutput { report }, json_mode);
    Ok(())
}
