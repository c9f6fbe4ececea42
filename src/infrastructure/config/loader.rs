//! Layered configuration: defaults, YAML files, then `REGCHECK_*` env vars.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::errors::ComplianceError;
use crate::domain::models::Config;
use crate::infrastructure::logging::{parse_log_level, LogFormat, RotationPolicy};

/// Highest allowed `pipeline.concurrency`
pub const MAX_CONCURRENCY: usize = 64;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `retrieval.top_k` is zero
    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    /// `pipeline.concurrency` is outside 1..=64
    #[error("Invalid concurrency: {0}. Must be between 1 and 64")]
    InvalidConcurrency(usize),

    /// `embedding.dimension` is zero
    #[error("Invalid embedding dimension: {0}. Must be positive")]
    InvalidDimension(usize),

    /// `embedding.batch_size` is zero
    #[error("Invalid embedding batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    /// A rate limit is zero or negative
    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    /// Unknown `logging.level`
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// `database.max_connections` is zero
    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    /// Initial backoff above the maximum
    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    /// Any other cross-field check
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl From<ConfigError> for ComplianceError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .regcheck/config.yaml (project config)
    /// 3. .regcheck/local.yaml (local overrides, optional)
    /// 4. Environment variables (REGCHECK_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".regcheck/config.yaml"))
            .merge(Yaml::file(".regcheck/local.yaml"))
            .merge(Env::prefixed("REGCHECK_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring `REGCHECK_*` overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("REGCHECK_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(config.retrieval.top_k));
        }

        if config.pipeline.concurrency == 0 || config.pipeline.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency(config.pipeline.concurrency));
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension(config.embedding.dimension));
        }

        if config.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(config.embedding.batch_size));
        }

        if config.embedding.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "embedding.model cannot be empty".to_string(),
            ));
        }

        if config.corpus.table.trim().is_empty() || config.corpus.schema.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "corpus.schema and corpus.table cannot be empty".to_string(),
            ));
        }

        if config.judge.min_chunks > config.retrieval.top_k {
            return Err(ConfigError::ValidationFailed(format!(
                "judge.min_chunks ({}) cannot exceed retrieval.top_k ({})",
                config.judge.min_chunks, config.retrieval.top_k
            )));
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        if parse_log_level(&config.logging.level).is_err() {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.logging.format.parse::<LogFormat>().is_err() {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.logging.rotation.parse::<RotationPolicy>().is_err() {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        // NaN fails this comparison too
        if !(config.rate_limit.requests_per_second > 0.0) {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DistanceMetric, EmbeddingMode, LlmProviderKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.mode, EmbeddingMode::Database);
        assert_eq!(config.index.index_type, "lantern_hnsw");
        assert_eq!(config.corpus.table, "compliance_documents");
        assert_eq!(config.ingestion.timeout_secs, 300);
        assert!(config.llm.temperature.abs() < f32::EPSILON);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
embedding:
  mode: client
  model: openai/text-embedding-3-large
  dimension: 3072
index:
  metric: cosine
  m: 16
llm:
  provider: anthropic
  model: claude-sonnet-4-5
retrieval:
  top_k: 5
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.embedding.mode, EmbeddingMode::Client);
        assert_eq!(config.embedding.dimension, 3072);
        assert_eq!(config.index.metric, DistanceMetric::Cosine);
        assert_eq!(config.index.m, Some(16));
        assert_eq!(config.llm.provider, LlmProviderKind::Anthropic);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.chunking.base_url, "http://localhost:8080");
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTopK(0)
        ));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut config = Config::default();
        config.pipeline.concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidConcurrency(0)
        ));
        config.pipeline.concurrency = 65;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidConcurrency(65)
        ));
    }

    #[test]
    fn test_validate_min_chunks_above_top_k() {
        let mut config = Config::default();
        config.judge.min_chunks = 4;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_settings() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidRotation(_)
        ));
    }

    #[test]
    fn test_validate_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidRateLimit(_)
        ));
        config.rate_limit.requests_per_second = f64::NAN;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_backoff_order() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(30000, 10000)
        ));
    }

    #[test]
    fn test_zero_retries_allowed() {
        let mut config = Config::default();
        config.retry.max_retries = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_config_error_maps_to_compliance_config() {
        let err: ComplianceError = ConfigError::InvalidTopK(0).into();
        assert!(matches!(err, ComplianceError::Config(_)));
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "corpus:\n  table: aml_rules\npipeline:\n  concurrency: 8\n"
        )
        .unwrap();

        temp_env::with_vars_unset(["REGCHECK_PIPELINE__CONCURRENCY"], || {
            let config = ConfigLoader::load_from_file(file.path()).unwrap();
            assert_eq!(config.corpus.table, "aml_rules");
            assert_eq!(config.corpus.schema, "public");
            assert_eq!(config.pipeline.concurrency, 8);
            assert_eq!(config.retrieval.top_k, 3);
        });
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retrieval:\n  top_k: 4\n").unwrap();

        temp_env::with_vars(
            [
                ("REGCHECK_RETRIEVAL__TOP_K", Some("7")),
                ("REGCHECK_LLM__MODEL", Some("gpt-4o-mini")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.retrieval.top_k, 7);
                assert_eq!(config.llm.model, "gpt-4o-mini");
            },
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(ConfigLoader::load_from_file("/nonexistent/regcheck.yaml").is_err());
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retrieval:\n  top_k: 0\n").unwrap();
        temp_env::with_vars_unset(["REGCHECK_RETRIEVAL__TOP_K"], || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }
}
