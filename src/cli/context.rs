//! Wiring shared by the command handlers: configuration and the corpus store.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::{Config, EmbeddingMode};
use crate::domain::ports::{CorpusDescriptor, CorpusStore, EmbeddingProvider};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{DatabaseConnection, PostgresCorpusStore};
use crate::infrastructure::embeddings::OpenAiEmbeddingProvider;

/// Loads configuration from `--config` or the project hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Opens the configured corpus store.
///
/// The caller owns the returned store and must `close` it on every path.
pub async fn open_store(config: &Config) -> Result<Arc<dyn CorpusStore>> {
    let descriptor = CorpusDescriptor::from_config(config);
    let embedder: Option<Arc<dyn EmbeddingProvider>> = match config.embedding.mode {
        EmbeddingMode::Database => None,
        EmbeddingMode::Client => Some(Arc::new(
            OpenAiEmbeddingProvider::from_config(&config.embedding, &config.retry)
                .context("Failed to create embedding provider")?,
        )),
    };

    let connection = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;

    let store = match embedder {
        None => PostgresCorpusStore::new(connection.clone(), descriptor),
        Some(embedder) => PostgresCorpusStore::with_embedder(connection.clone(), descriptor, embedder),
    };
    match store {
        Ok(store) => {
            debug!(mode = ?store.mode(), "Corpus store opened");
            Ok(Arc::new(store))
        }
        Err(err) => {
            connection.close().await;
            Err(err).context("Failed to open corpus store")
        }
    }
}
