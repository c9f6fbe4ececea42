//! Similarity search types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::document::DocumentId;

/// Distance metric of the similarity index and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2Squared,
    /// One minus cosine similarity
    Cosine,
}

impl DistanceMetric {
    /// SQL distance operator used in `ORDER BY`.
    pub const fn operator(self) -> &'static str {
        match self {
            Self::L2Squared => "<->",
            Self::Cosine => "<=>",
        }
    }

    /// Operator class of the ANN index.
    pub const fn operator_class(self) -> &'static str {
        match self {
            Self::L2Squared => "dist_l2sq_ops",
            Self::Cosine => "dist_cos_ops",
        }
    }

    /// Distance between two equal-length vectors.
    ///
    /// A zero-norm operand has cosine distance 1.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::L2Squared => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = f64::from(*x) - f64::from(*y);
                    d * d
                })
                .sum(),
            Self::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
                for (x, y) in a.iter().zip(b) {
                    let (x, y) = (f64::from(*x), f64::from(*y));
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (na.sqrt() * nb.sqrt())
                }
            }
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2Squared => f.write_str("l2_squared"),
            Self::Cosine => f.write_str("cosine"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2_squared" | "l2sq" | "l2" => Ok(Self::L2Squared),
            "cosine" | "cos" => Ok(Self::Cosine),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

/// One row returned by a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Corpus row id
    pub id: DocumentId,
    /// Chunk text
    pub chunk: String,
    /// Distance under the corpus metric; smaller is nearer
    pub distance: f64,
}

/// Nearest chunks for one query, ascending by distance, at most `k` long.
pub type RetrievalResult = Vec<RetrievedChunk>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_squared() {
        let d = DistanceMetric::L2Squared.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine() {
        let same = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]);
        assert!(same.abs() < 1e-9);
        let orthogonal = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((orthogonal - 1.0).abs() < 1e-9);
        let zero = DistanceMetric::Cosine.distance(&[0.0, 0.0], &[0.0, 1.0]);
        assert!((zero - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sql_tokens() {
        assert_eq!(DistanceMetric::L2Squared.operator(), "<->");
        assert_eq!(DistanceMetric::Cosine.operator_class(), "dist_cos_ops");
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!("cos".parse::<DistanceMetric>(), Ok(DistanceMetric::Cosine));
        assert_eq!("L2SQ".parse::<DistanceMetric>(), Ok(DistanceMetric::L2Squared));
        assert!("hamming".parse::<DistanceMetric>().is_err());
    }
}
