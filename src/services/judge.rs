//! Compliance judge: prompt construction, LLM call, verdict parsing.

use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::{JudgeConfig, LlmConfig, RetrievedChunk, Verdict};
use crate::domain::ports::{CompletionRequest, LlmClient};

/// System instruction constraining the answer to a single boolean token.
pub const SYSTEM_INSTRUCTION: &str = "You are a compliance officer reviewing chat messages \
against financial regulations. Decide whether the message complies with the regulation \
excerpts provided. Answer with exactly one word: True if the message is compliant, \
False if it is not. Do not explain.";

/// Builds the user prompt for one query.
///
/// The output depends only on its inputs, so a fixed query and retrieval
/// always produce the same prompt.
pub fn build_prompt(query: &str, chunks: &[RetrievedChunk], include_text: bool) -> String {
    let mut prompt = String::from("Regulation excerpts:\n");
    for chunk in chunks {
        if include_text {
            let _ = writeln!(prompt, "[document {}]\n{}\n", chunk.id, chunk.chunk.trim());
        } else {
            let _ = writeln!(prompt, "[document {}]", chunk.id);
        }
    }
    let _ = write!(
        prompt,
        "\nMessage:\n{}\n\nIs this message compliant with the regulation excerpts above? Answer True or False.",
        query.trim()
    );
    prompt
}

/// Parses the LLM answer.
///
/// Whitespace is trimmed and case ignored; anything other than `true` or
/// `false` is a parse error carrying the raw answer.
pub fn parse_verdict(raw: &str) -> ComplianceResult<Verdict> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case("true") {
        Ok(Verdict::Compliant)
    } else if token.eq_ignore_ascii_case("false") {
        Ok(Verdict::NonCompliant)
    } else {
        Err(ComplianceError::Parse {
            raw: raw.to_string(),
        })
    }
}

/// Asks the LLM whether a message complies with its retrieved chunks.
pub struct ComplianceJudge {
    llm: Arc<dyn LlmClient>,
    min_chunks: usize,
    include_chunk_text: bool,
    max_tokens: u32,
    temperature: f32,
}

impl ComplianceJudge {
    /// Judge over `llm`; `min_chunks` is raised to at least 1.
    pub fn new(llm: Arc<dyn LlmClient>, judge: &JudgeConfig, llm_config: &LlmConfig) -> Self {
        Self {
            llm,
            min_chunks: judge.min_chunks.max(1),
            include_chunk_text: judge.include_chunk_text,
            max_tokens: llm_config.max_tokens,
            temperature: llm_config.temperature,
        }
    }

    /// Model answering the judgments.
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// The completion request that `judge` would send.
    pub fn request(&self, query: &str, chunks: &[RetrievedChunk]) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: build_prompt(query, chunks, self.include_chunk_text),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Judges one query against its retrieved chunks.
    ///
    /// Fewer chunks than `min_chunks` is a data error; the LLM is not called.
    #[instrument(skip(self, query, chunks), fields(chunks = chunks.len()))]
    pub async fn judge(&self, query: &str, chunks: &[RetrievedChunk]) -> ComplianceResult<Verdict> {
        if chunks.len() < self.min_chunks {
            return Err(ComplianceError::Data(format!(
                "retrieved {} chunks, at least {} required to judge",
                chunks.len(),
                self.min_chunks
            )));
        }

        let answer = self.llm.complete(&self.request(query, chunks)).await?;
        let verdict = parse_verdict(&answer);
        match &verdict {
            Ok(v) => debug!(verdict = ?v, "Judged"),
            Err(_) => warn!(answer = %answer, "Unparseable judge answer"),
        }
        verdict
    }
}
