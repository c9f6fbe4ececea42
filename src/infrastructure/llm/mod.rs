//! LLM back ends for the compliance judge
//!
//! - Anthropic Messages API (`POST /v1/messages`)
//! - OpenAI-compatible chat completions (`POST /chat/completions`)
//!
//! Both go through [`JsonServiceClient`](crate::infrastructure::http::JsonServiceClient),
//! sharing its retry policy and token-bucket rate limiter.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiChatClient;

use std::sync::Arc;
use tracing::info;

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{Config, LlmProviderKind};
use crate::domain::ports::LlmClient;
use crate::infrastructure::http::{RetryPolicy, ServiceClientConfig};

/// Builds the configured LLM client.
///
/// The API key falls back to `ANTHROPIC_API_KEY` or `OPENAI_API_KEY`
/// depending on the provider. A missing key is a configuration error.
pub fn create_llm_client(config: &Config) -> ComplianceResult<Arc<dyn LlmClient>> {
    let llm = &config.llm;
    let (env_var, default_base) = match llm.provider {
        LlmProviderKind::Anthropic => ("ANTHROPIC_API_KEY", anthropic::DEFAULT_BASE_URL),
        LlmProviderKind::Openai => ("OPENAI_API_KEY", openai::DEFAULT_BASE_URL),
    };

    let api_key = llm
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok())
        .ok_or_else(|| {
            ComplianceError::Config(format!(
                "LLM API key not set. Set {env_var} env var or configure llm.api_key."
            ))
        })?;

    let base_url = llm.base_url.clone().unwrap_or_else(|| default_base.to_string());
    let client_config = |service: &'static str| {
        ServiceClientConfig::new(service, base_url.clone())
            .with_timeout(llm.timeout_secs)
            .with_retry(RetryPolicy::from_config(&config.retry))
            .with_rate_limit(config.rate_limit.requests_per_second)
    };

    info!(provider = ?llm.provider, model = %llm.model, "Creating LLM client");
    let client: Arc<dyn LlmClient> = match llm.provider {
        LlmProviderKind::Anthropic => Arc::new(AnthropicClient::new(
            client_config(anthropic::SERVICE),
            &api_key,
            llm.model.clone(),
        )?),
        LlmProviderKind::Openai => Arc::new(OpenAiChatClient::new(
            client_config(openai::SERVICE),
            &api_key,
            llm.model.clone(),
        )?),
    };
    Ok(client)
}
