//! OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::ports::{CompletionRequest, LlmClient};
use crate::infrastructure::http::{scrub_api_key, JsonServiceClient, ServiceClientConfig};

pub(crate) const SERVICE: &str = "openai";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiChatClient {
    client: JsonServiceClient,
    model: String,
}

impl OpenAiChatClient {
    /// Authenticates with a bearer token.
    pub fn new(
        config: ServiceClientConfig,
        api_key: &str,
        model: String,
    ) -> ComplianceResult<Self> {
        debug!(api_key = %scrub_api_key(api_key), "Configuring OpenAI chat client");
        let config = config
            .with_bearer(api_key)
            .map_err(|e| e.into_compliance(SERVICE))?;
        let client = JsonServiceClient::new(config).map_err(|e| e.into_compliance(SERVICE))?;
        Ok(Self { client, model })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> ComplianceResult<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response: ChatCompletionResponse = self
            .client
            .post_json("/chat/completions", &body)
            .await
            .map_err(|e| e.into_compliance(SERVICE))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ComplianceError::external(SERVICE, "response contained no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_content_deserializes() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(response.choices[0].message.content.is_none());
    }
}
