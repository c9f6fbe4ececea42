//! Concurrent retrieve → judge pipeline over a batch of queries.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::judge::ComplianceJudge;
use super::retrieval::RetrievalPipeline;
use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{ComplianceReport, OutcomeStatus, PipelineConfig, Query, QueryOutcome};

/// Callback invoked once per finished query, in input order.
pub type ProgressCallback = Arc<dyn Fn(&QueryOutcome) + Send + Sync>;

/// Runs every query through retrieval and judgment with bounded concurrency.
///
/// Outcomes are collected in input order regardless of completion order.
/// By default a failed query is recorded and the run continues; with
/// `fail_fast` the first failure aborts the run.
pub struct CompliancePipeline {
    retrieval: Arc<RetrievalPipeline>,
    judge: Arc<ComplianceJudge>,
    concurrency: usize,
    fail_fast: bool,
    progress: Option<ProgressCallback>,
}

impl CompliancePipeline {
    /// Pipeline with the configured concurrency and failure policy.
    pub fn new(
        retrieval: Arc<RetrievalPipeline>,
        judge: Arc<ComplianceJudge>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            retrieval,
            judge,
            concurrency: config.concurrency.max(1),
            fail_fast: config.fail_fast,
            progress: None,
        }
    }

    /// Calls `progress` once per finished query.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Retrieval stage, for callers that need the model check alone.
    pub fn retrieval(&self) -> &RetrievalPipeline {
        &self.retrieval
    }

    /// Retrieves and judges a single query. Never fails; errors become outcomes.
    pub async fn check(&self, query: Query) -> QueryOutcome {
        let retrieved = match self.retrieval.retrieve(&query.text).await {
            Ok(retrieved) => retrieved,
            Err(err) => {
                warn!(error = %err, "Retrieval failed");
                return QueryOutcome {
                    query,
                    retrieved: Vec::new(),
                    status: OutcomeStatus::failed(&err),
                };
            }
        };

        let status = OutcomeStatus::from_result(self.judge.judge(&query.text, &retrieved).await);
        QueryOutcome {
            query,
            retrieved,
            status,
        }
    }

    /// Runs all queries and assembles the report.
    #[instrument(skip(self, queries), fields(queries = queries.len(), concurrency = self.concurrency))]
    pub async fn run(&self, queries: Vec<Query>) -> ComplianceResult<ComplianceReport> {
        // Surface a model mismatch once instead of once per query
        self.retrieval.verify_model().await?;

        let outcomes: Vec<QueryOutcome> = stream::iter(queries)
            .map(|query| self.check(query))
            .buffered(self.concurrency)
            .map(|outcome| {
                if let Some(progress) = &self.progress {
                    progress(&outcome);
                }
                if self.fail_fast {
                    if let Some(err) = abort_error(&outcome) {
                        return Err(err);
                    }
                }
                Ok(outcome)
            })
            .try_collect()
            .await?;

        let report = ComplianceReport::new(self.judge.model(), self.retrieval.top_k(), outcomes);
        info!(
            judged = report.verdicts().len(),
            non_compliant = report.non_compliant().len(),
            failures = report.failures().len(),
            "Compliance run complete"
        );
        Ok(report)
    }
}

fn abort_error(outcome: &QueryOutcome) -> Option<ComplianceError> {
    match &outcome.status {
        OutcomeStatus::Judged { .. } => None,
        OutcomeStatus::Unparseable { raw } => Some(ComplianceError::Parse { raw: raw.clone() }),
        OutcomeStatus::Failed { kind, message } => {
            Some(ComplianceError::with_kind(*kind, message.clone()))
        }
    }
}
