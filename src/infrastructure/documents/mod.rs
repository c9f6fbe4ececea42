//! Clients for the external document-processing services
//!
//! - Ingestion: PDF URL → markdown rendition URL
//! - Chunking: markdown URL → ordered text chunks

pub mod chunking;
pub mod ingestion;

pub use chunking::ChunkingClient;
pub use ingestion::IngestionClient;

use crate::domain::models::{RetryConfig, ServiceEndpointConfig};
use crate::infrastructure::http::{RetryPolicy, ServiceClientConfig, ServiceError};

fn endpoint_client_config(
    service: &'static str,
    endpoint: &ServiceEndpointConfig,
    retry: &RetryConfig,
) -> Result<ServiceClientConfig, ServiceError> {
    let config = ServiceClientConfig::new(service, endpoint.base_url.clone())
        .with_timeout(endpoint.timeout_secs)
        .with_retry(RetryPolicy::from_config(retry));
    match endpoint.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => config.with_bearer(key),
        _ => Ok(config),
    }
}
