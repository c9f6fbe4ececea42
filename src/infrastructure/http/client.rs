//! Shared JSON-over-HTTP client.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::errors::ServiceError;
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;

/// Configuration for a [`JsonServiceClient`]
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Collaborator name used in logs and errors
    pub service: &'static str,

    /// Base URL; request paths are appended to it
    pub base_url: String,

    /// Headers sent with every request (auth, API versions)
    pub headers: HeaderMap,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// Requests per second, unlimited when `None`
    pub rate_limit_rps: Option<f64>,
}

impl ServiceClientConfig {
    /// Defaults: 120 second timeout, default retry policy, no rate limit.
    pub fn new(service: &'static str, base_url: impl Into<String>) -> Self {
        Self {
            service,
            base_url: base_url.into(),
            headers: HeaderMap::new(),
            timeout_secs: 120,
            retry: RetryPolicy::default(),
            rate_limit_rps: None,
        }
    }

    /// Adds `Authorization: Bearer <token>`.
    pub fn with_bearer(mut self, token: &str) -> Result<Self, ServiceError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| ServiceError::InvalidRequest(format!("Invalid API key: {e}")))?;
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(self)
    }

    /// Adds an arbitrary default header.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, ServiceError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ServiceError::InvalidRequest(format!("Invalid header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Overrides the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Caps outbound requests per second.
    #[must_use]
    pub const fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit_rps = Some(rps);
        self
    }
}

/// HTTP client for JSON request/response services
///
/// Provides:
/// - Connection pooling and reuse
/// - Optional token bucket rate limiting
/// - Exponential backoff retry on transient errors
/// - Status classification into [`ServiceError`]
pub struct JsonServiceClient {
    service: &'static str,
    http_client: ReqwestClient,
    base_url: String,
    rate_limiter: Option<Arc<TokenBucketRateLimiter>>,
    retry_policy: RetryPolicy,
}

impl JsonServiceClient {
    /// Builds the pooled HTTP client from `config`.
    pub fn new(mut config: ServiceClientConfig) -> Result<Self, ServiceError> {
        info!(
            service = config.service,
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            authenticated = config.headers.contains_key(header::AUTHORIZATION)
                || config.headers.contains_key("x-api-key"),
            "Initializing service client"
        );

        config.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(config.headers)
            .build()
            .map_err(ServiceError::NetworkError)?;

        Ok(Self {
            service: config.service,
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: config
                .rate_limit_rps
                .map(|rps| Arc::new(TokenBucketRateLimiter::new(rps))),
            retry_policy: config.retry,
        })
    }

    /// Collaborator name used in logs and errors.
    pub const fn service(&self) -> &'static str {
        self.service
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    #[instrument(skip(self, body), fields(service = self.service))]
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        // Every attempt, retries included, spends a token
        self.retry_policy
            .execute(|| async {
                if let Some(rate_limiter) = &self.rate_limiter {
                    rate_limiter.acquire().await;
                }
                debug!("POST {}", url);
                let response = self.http_client.post(&url).json(body).send().await?;
                Self::handle_response(response).await
            })
            .await
    }

    async fn handle_response<R: DeserializeOwned>(response: Response) -> Result<R, ServiceError> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!("Service error ({}): {}", status, body);
            return Err(ServiceError::from_status(status, body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }
}

/// Redacts an API key for logging, keeping a short prefix.
pub fn scrub_api_key(api_key: &str) -> String {
    match api_key.get(..8) {
        Some(prefix) if api_key.len() > 12 => format!("{prefix}...[REDACTED]"),
        _ => "[REDACTED]".to_string(),
    }
}
