//! Client for the PDF ingestion service.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::endpoint_client_config;
use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{RetryConfig, ServiceEndpointConfig};
use crate::infrastructure::http::{JsonServiceClient, ServiceClientConfig};

const SERVICE: &str = "ingestion";

#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
    markdown_url: String,
}

/// Converts source documents into markdown through the ingestion service.
pub struct IngestionClient {
    client: JsonServiceClient,
}

impl IngestionClient {
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

    /// Submits a PDF URL and returns the URL of its markdown rendition.
    #[instrument(skip(self))]
    pub async fn ingest_pdf(&self, document_url: &str) -> ComplianceResult<String> {
        let response: IngestResponse = self
            .client
            .post_json("/ingest/pdf", &IngestRequest { url: document_url })
            .await
            .map_err(|e| e.into_compliance(SERVICE))?;

        if response.markdown_url.trim().is_empty() {
            return Err(ComplianceError::external(
                SERVICE,
                format!("empty markdown_url returned for {document_url}"),
            ));
        }

        info!(markdown_url = %response.markdown_url, "Document ingested");
        Ok(response.markdown_url)
    }
}
