//! Corpus rows and their embedding lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{ComplianceError, ComplianceResult};

/// Identifier of a corpus row (`id INTEGER`).
pub type DocumentId = i32;

/// One chunk of an ingested regulation.
///
/// `vector` stays `None` until the embedding job has processed the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDocument {
    /// Row id, assigned by the loader
    pub id: DocumentId,
    /// Chunk text as returned by the chunking service
    pub chunk: String,
    /// Embedding, once written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl ComplianceDocument {
    /// A freshly inserted row awaiting its embedding.
    pub fn pending(id: DocumentId, chunk: impl Into<String>) -> Self {
        Self {
            id,
            chunk: chunk.into(),
            vector: None,
        }
    }

    /// A row whose embedding is already known.
    pub fn embedded(id: DocumentId, chunk: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id,
            chunk: chunk.into(),
            vector: Some(vector),
        }
    }

    /// Pending until a vector is present.
    pub const fn state(&self) -> EmbeddingState {
        if self.vector.is_some() {
            EmbeddingState::Embedded
        } else {
            EmbeddingState::Pending
        }
    }

    /// Rejects vectors whose length differs from the table dimension.
    pub fn check_dimension(&self, dimension: usize) -> ComplianceResult<()> {
        match &self.vector {
            Some(vector) if vector.len() != dimension => Err(ComplianceError::Data(format!(
                "document {} has a {}-dimensional vector, table expects {}",
                self.id,
                vector.len(),
                dimension
            ))),
            _ => Ok(()),
        }
    }
}

/// Embedding state of a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingState {
    /// Inserted, vector not yet written by the embedding job
    Pending,
    /// Vector present; eligible for similarity search
    Embedded,
}

/// Embedding completion across a corpus table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingProgress {
    /// Rows in the table
    pub total: u64,
    /// Rows with a vector
    pub embedded: u64,
    /// Rows still waiting for the embedding job
    pub pending: u64,
}

impl EmbeddingProgress {
    /// Derives `pending` from the two counts.
    pub const fn new(total: u64, embedded: u64) -> Self {
        Self {
            total,
            embedded,
            pending: total.saturating_sub(embedded),
        }
    }

    /// True once no row is pending.
    pub const fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_follows_vector() {
        assert_eq!(
            ComplianceDocument::pending(1, "a").state(),
            EmbeddingState::Pending
        );
        assert_eq!(
            ComplianceDocument::embedded(1, "a", vec![0.0; 3]).state(),
            EmbeddingState::Embedded
        );
    }

    #[test]
    fn test_check_dimension() {
        let doc = ComplianceDocument::embedded(7, "text", vec![1.0, 2.0]);
        assert!(doc.check_dimension(2).is_ok());
        let err = doc.check_dimension(3).unwrap_err();
        assert!(matches!(err, ComplianceError::Data(_)));
        assert!(ComplianceDocument::pending(8, "x").check_dimension(3).is_ok());
    }

    #[test]
    fn test_progress_pending() {
        let progress = EmbeddingProgress::new(10, 4);
        assert_eq!(progress.pending, 6);
        assert!(!progress.is_complete());
        assert!(EmbeddingProgress::new(0, 0).is_complete());
    }
}
