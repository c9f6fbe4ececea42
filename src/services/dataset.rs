//! Loading chat-message datasets.
//!
//! Accepts JSON Lines (`.jsonl`, `.ndjson`), a JSON array (`.json`) or CSV
//! with a header row (`.csv`) of `{id, speaker_role, text, compliant?}` rows.
//! An empty `compliant` cell in CSV means unlabelled.

use std::path::Path;
use tracing::info;

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{DatasetRecord, Query};

/// On-disk layout of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// One JSON object per line
    JsonLines,
    /// A single JSON array of objects
    JsonArray,
    /// Comma-separated values with a header row naming the fields
    Csv,
}

impl DatasetFormat {
    /// Format from the file extension, falling back to sniffing the content.
    pub fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "ndjson") => Self::JsonLines,
            Some("json") => Self::JsonArray,
            Some("csv") => Self::Csv,
            _ if content.trim_start().starts_with('[') => Self::JsonArray,
            _ => Self::JsonLines,
        }
    }
}

/// Row selection applied after parsing.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    /// Keep only rows from this speaker role (case-insensitive)
    pub speaker_role: Option<String>,
    /// Keep at most this many rows
    pub limit: Option<usize>,
}

impl DatasetFilter {
    fn apply(&self, records: Vec<DatasetRecord>) -> Vec<DatasetRecord> {
        let role_matches = |record: &DatasetRecord| {
            self.speaker_role
                .as_deref()
                .map_or(true, |role| record.speaker_role.eq_ignore_ascii_case(role))
        };
        records
            .into_iter()
            .filter(role_matches)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Parses dataset rows. Errors name the offending row (1-based).
pub fn parse_records(content: &str, format: DatasetFormat) -> ComplianceResult<Vec<DatasetRecord>> {
    let records = match format {
        DatasetFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<DatasetRecord>(line)
                    .map_err(|e| ComplianceError::Data(format!("dataset row {}: {e}", n + 1)))
            })
            .collect::<ComplianceResult<Vec<_>>>()?,
        DatasetFormat::JsonArray => {
            let rows: Vec<serde_json::Value> = serde_json::from_str(content)
                .map_err(|e| ComplianceError::Data(format!("dataset is not a JSON array: {e}")))?;
            rows.into_iter()
                .enumerate()
                .map(|(n, row)| {
                    serde_json::from_value::<DatasetRecord>(row)
                        .map_err(|e| ComplianceError::Data(format!("dataset row {}: {e}", n + 1)))
                })
                .collect::<ComplianceResult<Vec<_>>>()?
        }
        DatasetFormat::Csv => csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
            .deserialize::<DatasetRecord>()
            .enumerate()
            .map(|(n, row)| {
                row.map_err(|e| ComplianceError::Data(format!("dataset row {}: {e}", n + 1)))
            })
            .collect::<ComplianceResult<Vec<_>>>()?,
    };

    if let Some(blank) = records.iter().find(|r| r.text.trim().is_empty()) {
        return Err(ComplianceError::Data(format!(
            "dataset row with id {} has empty text",
            blank.id
        )));
    }
    Ok(records)
}

/// Reads a dataset file and converts the selected rows into queries.
pub async fn load_queries(path: &Path, filter: &DatasetFilter) -> ComplianceResult<Vec<Query>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ComplianceError::Data(format!("cannot read dataset {}: {e}", path.display()))
    })?;

    let format = DatasetFormat::detect(path, &content);
    let records = parse_records(&content, format)?;
    let total = records.len();
    let queries: Vec<Query> = filter.apply(records).into_iter().map(Query::from).collect();

    info!(
        path = %path.display(),
        rows = total,
        selected = queries.len(),
        "Dataset loaded"
    );
    Ok(queries)
}
