//! OpenAI embedding provider adapter.
//!
//! Calls the `/embeddings` endpoint of any OpenAI-compatible API. Used when
//! the corpus runs in client embedding mode: the provider embeds both the
//! pending corpus rows and every incoming query.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{EmbeddingConfig, RetryConfig};
use crate::domain::ports::EmbeddingProvider;
use crate::infrastructure::http::{
    scrub_api_key, JsonServiceClient, RetryPolicy, ServiceClientConfig,
};

const SERVICE: &str = "embedding";

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    client: JsonServiceClient,
    /// Model id as recorded with the corpus, e.g. `openai/text-embedding-3-small`
    model: String,
    dimension: usize,
    max_batch_size: usize,
}

impl OpenAiEmbeddingProvider {
    /// Builds the provider from configuration.
    ///
    /// The API key falls back to `OPENAI_API_KEY`.
    pub fn from_config(config: &EmbeddingConfig, retry: &RetryConfig) -> ComplianceResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ComplianceError::Config(
                    "OpenAI API key not set. Set OPENAI_API_KEY env var or configure embedding.api_key."
                        .to_string(),
                )
            })?;
        debug!(api_key = %scrub_api_key(&api_key), "Using embedding API key");

        let client_config = ServiceClientConfig::new(SERVICE, config.base_url.clone())
            .with_bearer(&api_key)
            .map_err(|e| e.into_compliance(SERVICE))?
            .with_timeout(config.timeout_secs)
            .with_retry(RetryPolicy::from_config(retry));

        Self::new(
            client_config,
            config.model.clone(),
            config.dimension,
            config.batch_size,
        )
    }

    /// Provider for `model`, which must produce `dimension`-wide vectors.
    pub fn new(
        client_config: ServiceClientConfig,
        model: String,
        dimension: usize,
        max_batch_size: usize,
    ) -> ComplianceResult<Self> {
        let client = JsonServiceClient::new(client_config).map_err(|e| e.into_compliance(SERVICE))?;
        Ok(Self {
            client,
            model,
            dimension,
            max_batch_size: max_batch_size.max(1),
        })
    }

    /// Model name as the API expects it, without the `openai/` provider prefix.
    fn api_model(&self) -> &str {
        self.model
            .split_once('/')
            .map_or(self.model.as_str(), |(_, name)| name)
    }

    async fn call_embeddings_api(&self, texts: &[String]) -> ComplianceResult<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: self.api_model(),
            input: texts,
        };

        let response: EmbeddingsResponse = self
            .client
            .post_json("/embeddings", &request)
            .await
            .map_err(|e| e.into_compliance(SERVICE))?;

        if response.data.len() != texts.len() {
            return Err(ComplianceError::external(
                SERVICE,
                format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    response.data.len()
                ),
            ));
        }

        // Sort by index to maintain input order
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimension {
                    Ok(d.embedding)
                } else {
                    Err(ComplianceError::Data(format!(
                        "embedding model returned {} dimensions, corpus expects {}",
                        d.embedding.len(),
                        self.dimension
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn embed(&self, text: &str) -> ComplianceResult<Vec<f32>> {
        let results = self.call_embeddings_api(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ComplianceError::external(SERVICE, "empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> ComplianceResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch_size) {
            debug!(batch = batch.len(), "Embedding batch");
            vectors.extend(self.call_embeddings_api(batch).await?);
        }
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAiEmbeddingProvider {
        OpenAiEmbeddingProvider::new(
            ServiceClientConfig::new(SERVICE, "http://localhost:9"),
            model.to_string(),
            3,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_api_model_strips_provider_prefix() {
        assert_eq!(
            provider("openai/text-embedding-3-small").api_model(),
            "text-embedding-3-small"
        );
        assert_eq!(provider("text-embedding-3-large").api_model(), "text-embedding-3-large");
    }

    #[test]
    fn test_batch_size_at_least_one() {
        assert_eq!(provider("m").max_batch_size(), 1);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let err = OpenAiEmbeddingProvider::from_config(
                &EmbeddingConfig::default(),
                &RetryConfig::default(),
            )
            .err()
            .unwrap();
            assert!(matches!(err, ComplianceError::Config(_)));
        });
    }
}
