//! Incoming chat messages to be checked.

use serde::{Deserialize, Serialize};

/// One row of the input dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Row id in the dataset
    pub id: i64,
    /// Who sent the message, e.g. `advisor`
    pub speaker_role: String,
    /// Message text
    pub text: String,
    /// Ground truth, used for evaluation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<bool>,
}

/// A message submitted to retrieval and judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Dataset row id, when the query came from a dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Message text
    pub text: String,
    /// Ground-truth label carried into the evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_compliant: Option<bool>,
}

impl Query {
    /// Unlabelled query with no dataset id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            expected_compliant: None,
        }
    }

    /// Attaches a ground-truth label.
    #[must_use]
    pub const fn with_expected(mut self, compliant: bool) -> Self {
        self.expected_compliant = Some(compliant);
        self
    }
}

impl From<DatasetRecord> for Query {
    fn from(record: DatasetRecord) -> Self {
        Self {
            id: Some(record.id),
            text: record.text,
            expected_compliant: record.compliant,
        }
    }
}
