//! LLM port used by the compliance judge.

use async_trait::async_trait;

use crate::domain::errors::ComplianceResult;

/// A single-turn completion: one system instruction, one user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,
    /// User turn
    pub prompt: String,
    /// Upper bound on the answer length
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Chat completion back end.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Sends the request and returns the raw text of the answer.
    async fn complete(&self, request: &CompletionRequest) -> ComplianceResult<String>;
}
