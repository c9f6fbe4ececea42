//! Top-k retrieval against the corpus store.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::RetrievalResult;
use crate::domain::ports::CorpusStore;

/// Retrieves the `k` chunks nearest to each query.
///
/// The first retrieval asserts that the corpus was embedded with the
/// configured model; the outcome is cached for the lifetime of the pipeline.
pub struct RetrievalPipeline {
    store: Arc<dyn CorpusStore>,
    top_k: usize,
    expected_model: String,
    model_checked: OnceCell<()>,
}

impl RetrievalPipeline {
    /// Fails with a Config error when `top_k` is zero.
    pub fn new(
        store: Arc<dyn CorpusStore>,
        top_k: usize,
        expected_model: impl Into<String>,
    ) -> ComplianceResult<Self> {
        if top_k == 0 {
            return Err(ComplianceError::Config(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            store,
            top_k,
            expected_model: expected_model.into(),
            model_checked: OnceCell::new(),
        })
    }

    /// Chunks returned per query.
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Store being searched.
    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    /// Fails with `ModelMismatch` when the corpus records another embedding model.
    pub async fn verify_model(&self) -> ComplianceResult<()> {
        self.model_checked
            .get_or_try_init(|| async {
                match self.store.stored_model().await? {
                    Some(stored) if stored != self.expected_model => {
                        Err(ComplianceError::ModelMismatch {
                            stored,
                            configured: self.expected_model.clone(),
                        })
                    }
                    Some(_) => Ok(()),
                    None => {
                        warn!("Corpus has no recorded embedding model");
                        Ok(())
                    }
                }
            })
            .await
            .map(|_| ())
    }

    /// The `top_k` nearest embedded chunks, after the model check.
    #[instrument(skip(self, query), fields(k = self.top_k))]
    pub async fn retrieve(&self, query: &str) -> ComplianceResult<RetrievalResult> {
        self.verify_model().await?;
        let result = self.store.nearest(query, self.top_k).await?;
        debug!(
            hits = result.len(),
            best = result.first().map(|c| c.distance),
            "Retrieved"
        );
        Ok(result)
    }
}
