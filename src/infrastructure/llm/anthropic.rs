//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::ports::{CompletionRequest, LlmClient};
use crate::infrastructure::http::{scrub_api_key, JsonServiceClient, ServiceClientConfig};

pub(crate) const SERVICE: &str = "anthropic";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Request to the Messages API
#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response from the Messages API
#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Content block within a response; non-text blocks are ignored
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Claude Messages API client
pub struct AnthropicClient {
    client: JsonServiceClient,
    model: String,
}

impl AnthropicClient {
    /// Sends `api_key` as `x-api-key` with the pinned API version.
    pub fn new(
        config: ServiceClientConfig,
        api_key: &str,
        model: String,
    ) -> ComplianceResult<Self> {
        debug!(api_key = %scrub_api_key(api_key), "Configuring Anthropic client");
        let config = config
            .with_header("x-api-key", api_key.trim())
            .and_then(|c| c.with_header("anthropic-version", ANTHROPIC_VERSION))
            .map_err(|e| e.into_compliance(SERVICE))?;
        let client = JsonServiceClient::new(config).map_err(|e| e.into_compliance(SERVICE))?;
        Ok(Self { client, model })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> ComplianceResult<String> {
        let body = MessageRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response: MessageResponse = self
            .client
            .post_json("/v1/messages", &body)
            .await
            .map_err(|e| e.into_compliance(SERVICE))?;

        debug!(stop_reason = ?response.stop_reason, "Message received");
        let text: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(ComplianceError::external(SERVICE, "response contained no text"));
        }
        Ok(text)
    }
}
