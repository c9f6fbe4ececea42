//! Domain errors for the regcheck compliance pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Taxonomy bucket an error belongs to.
///
/// Reports group per-query failures by kind so a broken integration
/// (`ExternalService`, `Schema`) can be told apart from bad input (`Data`)
/// or an unexpected model answer (`Parse`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A collaborating service or the database failed
    ExternalService,
    /// Table, metadata or model did not match expectations
    Schema,
    /// The LLM answered with something other than True or False
    Parse,
    /// Input rows or vectors were malformed
    Data,
    /// Configuration was invalid
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExternalService => "external_service",
            Self::Schema => "schema",
            Self::Parse => "parse",
            Self::Data => "data",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by every stage of the compliance workflow.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Non-2xx response, connection failure or invalid payload from an
    /// external collaborator (ingestion, chunking, embedding, LLM, database).
    #[error("{service} service error: {message}")]
    ExternalService { service: String, message: String },

    /// Table, index or metadata conflict in the corpus store.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The corpus was embedded with a different model than the one configured.
    #[error("Embedding model mismatch for corpus: stored '{stored}', configured '{configured}'")]
    ModelMismatch { stored: String, configured: String },

    /// LLM output did not match the expected binary token.
    #[error("Unparseable judge output: {raw:?}")]
    Parse { raw: String },

    /// Missing or malformed input data.
    #[error("Data error: {0}")]
    Data(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ComplianceError {
    /// Builds an external service error for the named collaborator.
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Rebuilds an error of the given kind from a recorded message.
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::ExternalService => Self::external("pipeline", message),
            ErrorKind::Schema => Self::Schema(message),
            ErrorKind::Parse => Self::Parse { raw: message },
            ErrorKind::Data => Self::Data(message),
            ErrorKind::Config => Self::Config(message),
        }
    }

    /// Taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ExternalService { .. } => ErrorKind::ExternalService,
            Self::Schema(_) | Self::ModelMismatch { .. } => ErrorKind::Schema,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Data(_) => ErrorKind::Data,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Result alias used across the domain and services.
pub type ComplianceResult<T> = Result<T, ComplianceError>;

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Data(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ComplianceError::external("llm", "boom").kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            ComplianceError::ModelMismatch {
                stored: "a".to_string(),
                configured: "b".to_string(),
            }
            .kind(),
            ErrorKind::Schema
        );
        assert_eq!(
            ComplianceError::Parse {
                raw: "Maybe".to_string()
            }
            .kind(),
            ErrorKind::Parse
        );
        assert_eq!(ComplianceError::Data("x".to_string()).kind(), ErrorKind::Data);
    }

    #[test]
    fn test_with_kind_preserves_kind() {
        for kind in [
            ErrorKind::ExternalService,
            ErrorKind::Schema,
            ErrorKind::Parse,
            ErrorKind::Data,
            ErrorKind::Config,
        ] {
            assert_eq!(ComplianceError::with_kind(kind, "msg").kind(), kind);
        }
    }

    #[test]
    fn test_display_includes_service() {
        let err = ComplianceError::external("chunking", "HTTP 502");
        assert_eq!(err.to_string(), "chunking service error: HTTP 502");
    }
}
