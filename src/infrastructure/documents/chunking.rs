//! Client for the markdown chunking service.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::endpoint_client_config;
use crate::domain::errors::ComplianceResult;
use crate::domain::models::{RetryConfig, ServiceEndpointConfig};
use crate::infrastructure::http::{JsonServiceClient, ServiceClientConfig};

const SERVICE: &str = "chunking";

#[derive(Debug, Serialize)]
struct ChunkRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    chunks: Vec<String>,
}

/// Splits markdown into structure-aware chunks through the chunking service.
pub struct ChunkingClient {
    client: JsonServiceClient,
}

impl ChunkingClient {
    /// Client over an explicit service configuration.
    pub fn new(config: ServiceClientConfig) -> ComplianceResult<Self> {
        let client = JsonServiceClient::new(config).map_err(|e| e.into_compliance(SERVICE))?;
        Ok(Self { client })
    }

    /// Client for the configured endpoint with the shared retry policy.
    pub fn from_config(
        endpoint: &ServiceEndpointConfig,
        retry: &RetryConfig,
    ) -> ComplianceResult<Self> {
        let config =
            endpoint_client_config(SERVICE, endpoint, retry).map_err(|e| e.into_compliance(SERVICE))?;
        Self::new(config)
    }

    /// Returns the chunks of the markdown document, in document order.
    #[instrument(skip(self))]
    pub async fn chunk(&self, markdown_url: &str) -> ComplianceResult<Vec<String>> {
        let response: ChunkResponse = self
            .client
            .post_json("/chunk", &ChunkRequest { url: markdown_url })
            .await
            .map_err(|e| e.into_compliance(SERVICE))?;

        info!(chunks = response.chunks.len(), "Markdown chunked");
        Ok(response.chunks)
    }
}
