//! Postgres pool setup.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::DatabaseConfig;

/// Database connection pool manager
///
/// One pool is acquired per command and handed explicitly to the store.
/// Callers must [`close`](Self::close) it on every exit path.
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Create a new Postgres connection pool
    ///
    /// The URL comes from `database.url`, falling back to `DATABASE_URL`.
    pub async fn connect(config: &DatabaseConfig) -> ComplianceResult<Self> {
        let url = resolve_url(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(30))
            .connect(&url)
            .await
            .map_err(|e| {
                ComplianceError::external("database", format!("failed to create connection pool: {e}"))
            })?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool ready"
        );
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn resolve_url(config: &DatabaseConfig) -> ComplianceResult<String> {
    config
        .url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| {
            ComplianceError::Config(
                "database URL not set. Set DATABASE_URL env var or configure database.url."
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_config_wins() {
        temp_env::with_var("DATABASE_URL", Some("postgres://env/db"), || {
            let config = DatabaseConfig {
                url: Some("postgres://config/db".to_string()),
                ..DatabaseConfig::default()
            };
            assert_eq!(resolve_url(&config).unwrap(), "postgres://config/db");
        });
    }

    #[test]
    fn test_url_env_fallback() {
        temp_env::with_var("DATABASE_URL", Some("postgres://env/db"), || {
            assert_eq!(
                resolve_url(&DatabaseConfig::default()).unwrap(),
                "postgres://env/db"
            );
        });
    }

    #[test]
    fn test_missing_url_is_config_error() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = resolve_url(&DatabaseConfig::default()).unwrap_err();
            assert!(matches!(err, ComplianceError::Config(_)));
        });
    }
}
