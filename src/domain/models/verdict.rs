//! Judgments and the aggregated compliance report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::query::Query;
use super::retrieval::RetrievedChunk;
use crate::domain::errors::{ComplianceError, ErrorKind};

/// Binary judgment returned by the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The message is consistent with the retrieved regulation
    Compliant,
    /// The message contradicts the retrieved regulation
    NonCompliant,
}

impl Verdict {
    /// True for [`Verdict::Compliant`].
    pub const fn is_compliant(self) -> bool {
        matches!(self, Self::Compliant)
    }
}

impl From<bool> for Verdict {
    fn from(compliant: bool) -> Self {
        if compliant {
            Self::Compliant
        } else {
            Self::NonCompliant
        }
    }
}

/// `{query, compliant}` pair exposed to report consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    /// Message text
    pub query: String,
    /// The judge's answer
    pub compliant: bool,
}

/// What happened to a single query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The LLM answered with a recognised token
    Judged { verdict: Verdict },
    /// The LLM answered, but not with `True` or `False`
    Unparseable { raw: String },
    /// Retrieval or judgment failed before a verdict was available
    Failed { kind: ErrorKind, message: String },
}

impl OutcomeStatus {
    /// Maps a judge result onto the three-way outcome.
    pub fn from_result(result: Result<Verdict, ComplianceError>) -> Self {
        match result {
            Ok(verdict) => Self::Judged { verdict },
            Err(ComplianceError::Parse { raw }) => Self::Unparseable { raw },
            Err(err) => Self::failed(&err),
        }
    }

    /// Failure outcome carrying the error kind and message.
    pub fn failed(err: &ComplianceError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of the embed → retrieve → judge pipeline for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// The message that was checked
    pub query: Query,
    /// Chunks shown to the judge, nearest first
    #[serde(default)]
    pub retrieved: Vec<RetrievedChunk>,
    /// Verdict, unparseable answer or failure
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl QueryOutcome {
    /// The verdict, when the query was judged.
    pub const fn verdict(&self) -> Option<Verdict> {
        match &self.status {
            OutcomeStatus::Judged { verdict } => Some(*verdict),
            _ => None,
        }
    }
}

/// Confusion counts against ground truth, with non-compliant as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Flagged and labelled non-compliant
    pub true_positives: usize,
    /// Flagged but labelled compliant
    pub false_positives: usize,
    /// Passed and labelled compliant
    pub true_negatives: usize,
    /// Passed but labelled non-compliant
    pub false_negatives: usize,
    /// Labelled queries without a verdict
    pub unjudged: usize,
}

impl Evaluation {
    /// Labelled queries that received a verdict.
    pub const fn judged(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Share of judged queries matching their label.
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> Option<f64> {
        let judged = self.judged();
        (judged > 0).then(|| (self.true_positives + self.true_negatives) as f64 / judged as f64)
    }

    /// Share of flagged queries that were labelled non-compliant.
    #[allow(clippy::cast_precision_loss)]
    pub fn precision(&self) -> Option<f64> {
        let flagged = self.true_positives + self.false_positives;
        (flagged > 0).then(|| self.true_positives as f64 / flagged as f64)
    }

    /// Share of labelled non-compliant queries that were flagged.
    #[allow(clippy::cast_precision_loss)]
    pub fn recall(&self) -> Option<f64> {
        let actual = self.true_positives + self.false_negatives;
        (actual > 0).then(|| self.true_positives as f64 / actual as f64)
    }
}

/// Outcomes of a run, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Unique per run
    pub run_id: Uuid,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
    /// Model that produced the verdicts
    pub llm_model: String,
    /// Chunks retrieved per query
    pub top_k: usize,
    /// One per input query, in input order
    pub outcomes: Vec<QueryOutcome>,
}

impl ComplianceReport {
    /// Stamps a fresh run id and the current time.
    pub fn new(llm_model: impl Into<String>, top_k: usize, outcomes: Vec<QueryOutcome>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            llm_model: llm_model.into(),
            top_k,
            outcomes,
        }
    }

    /// Verdicts of every judged query, in input order.
    pub fn verdicts(&self) -> Vec<ComplianceVerdict> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.verdict().map(|v| ComplianceVerdict {
                    query: o.query.text.clone(),
                    compliant: v.is_compliant(),
                })
            })
            .collect()
    }

    /// Mapping from query text to verdict. Later duplicates win.
    pub fn verdict_map(&self) -> HashMap<String, bool> {
        self.verdicts()
            .into_iter()
            .map(|v| (v.query, v.compliant))
            .collect()
    }

    /// Queries judged non-compliant, in input order.
    pub fn non_compliant(&self) -> Vec<&Query> {
        self.outcomes
            .iter()
            .filter(|o| o.verdict() == Some(Verdict::NonCompliant))
            .map(|o| &o.query)
            .collect()
    }

    /// Outcomes without a verdict (unparseable or failed).
    pub fn failures(&self) -> Vec<&QueryOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.verdict().is_none())
            .collect()
    }

    /// Evaluation against ground truth, if any query carries a label.
    pub fn evaluation(&self) -> Option<Evaluation> {
        let mut eval = Evaluation::default();
        let mut labelled = false;
        for outcome in &self.outcomes {
            let Some(expected) = outcome.query.expected_compliant else {
                continue;
            };
            labelled = true;
            match (outcome.verdict(), expected) {
                (Some(Verdict::NonCompliant), false) => eval.true_positives += 1,
                (Some(Verdict::NonCompliant), true) => eval.false_positives += 1,
                (Some(Verdict::Compliant), true) => eval.true_negatives += 1,
                (Some(Verdict::Compliant), false) => eval.false_negatives += 1,
                (None, _) => eval.unjudged += 1,
            }
        }
        labelled.then_some(eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(text: &str, expected: Option<bool>, status: OutcomeStatus) -> QueryOutcome {
        QueryOutcome {
            query: Query {
                id: None,
                text: text.to_string(),
                expected_compliant: expected,
            },
            retrieved: vec![],
            status,
        }
    }

    fn judged(compliant: bool) -> OutcomeStatus {
        OutcomeStatus::Judged {
            verdict: Verdict::from(compliant),
        }
    }

    #[test]
    fn test_from_result_three_way() {
        assert_eq!(
            OutcomeStatus::from_result(Ok(Verdict::Compliant)),
            judged(true)
        );
        assert_eq!(
            OutcomeStatus::from_result(Err(ComplianceError::Parse {
                raw: "Maybe".to_string()
            })),
            OutcomeStatus::Unparseable {
                raw: "Maybe".to_string()
            }
        );
        match OutcomeStatus::from_result(Err(ComplianceError::Data("no chunks".to_string()))) {
            OutcomeStatus::Failed { kind, .. } => assert_eq!(kind, ErrorKind::Data),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_report_views() {
        let report = ComplianceReport::new(
            "gpt-4o",
            3,
            vec![
                outcome("a", Some(true), judged(true)),
                outcome("b", Some(false), judged(false)),
                outcome("c", Some(true), judged(false)),
                outcome(
                    "d",
                    Some(false),
                    OutcomeStatus::Unparseable {
                        raw: "?".to_string(),
                    },
                ),
            ],
        );

        let flagged: Vec<&str> = report.non_compliant().iter().map(|q| q.text.as_str()).collect();
        assert_eq!(flagged, vec!["b", "c"]);
        assert_eq!(report.verdicts().len(), 3);
        assert_eq!(report.verdict_map().get("a"), Some(&true));
        assert_eq!(report.failures().len(), 1);

        let eval = report.evaluation().unwrap();
        assert_eq!(eval.true_positives, 1);
        assert_eq!(eval.false_positives, 1);
        assert_eq!(eval.true_negatives, 1);
        assert_eq!(eval.false_negatives, 0);
        assert_eq!(eval.unjudged, 1);
        assert!((eval.accuracy().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((eval.precision().unwrap() - 0.5).abs() < 1e-9);
        assert!((eval.recall().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_labels_no_evaluation() {
        let report = ComplianceReport::new("m", 3, vec![outcome("a", None, judged(true))]);
        assert!(report.evaluation().is_none());
    }

    #[test]
    fn test_outcome_serializes_flat_status() {
        let json = serde_json::to_value(outcome("a", None, judged(false))).unwrap();
        assert_eq!(json["status"], "judged");
        assert_eq!(json["verdict"], "non_compliant");
    }
}
