//! Shared test utilities
//!
//! In-process doubles for the embedding and LLM ports plus a store factory,
//! so pipeline tests run without Postgres or network access.

#![allow(dead_code)]

use async_trait::async_trait;
use regcheck::domain::errors::{ComplianceError, ComplianceResult};
use regcheck::domain::models::DistanceMetric;
use regcheck::domain::ports::{
    CompletionRequest, CorpusDescriptor, CorpusStore, EmbeddingProvider, LlmClient,
};
use regcheck::infrastructure::database::MemoryCorpusStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_MODEL: &str = "test/fixed-embeddings";

/// Embedder returning fixed vectors for known texts.
///
/// Unknown texts map to a character-histogram vector so every input has a
/// deterministic embedding of the right width. While the outage switch is on,
/// every call fails with an embedding service error.
pub struct FixedEmbedder {
    model: String,
    dimension: usize,
    known: HashMap<String, Vec<f32>>,
    outage: Arc<AtomicBool>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            model: TEST_MODEL.to_string(),
            dimension,
            known: HashMap::new(),
            outage: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that makes the embedder fail while set.
    pub fn outage_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.outage)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimension, "fixture vector width");
        self.known.insert(text.to_string(), vector);
        self
    }

    fn histogram(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for byte in text.bytes().filter(u8::is_ascii_alphanumeric) {
            vector[usize::from(byte) % self.dimension] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> ComplianceResult<Vec<f32>> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(ComplianceError::external("embedding", "503 Service Unavailable"));
        }
        Ok(self
            .known
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.histogram(text)))
    }

    async fn embed_batch(&self, texts: &[String]) -> ComplianceResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn max_batch_size(&self) -> usize {
        16
    }
}

type Responder = dyn Fn(&CompletionRequest) -> ComplianceResult<String> + Send + Sync;

/// LLM double answering through a closure and recording every prompt.
pub struct ScriptedLlm {
    responder: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> ComplianceResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `answer`.
    pub fn constant(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::new(move |_| Ok(answer.clone()))
    }

    /// Answers `False` when the prompt contains `marker`, `True` otherwise.
    pub fn flagging(marker: &str) -> Self {
        let marker = marker.to_string();
        Self::new(move |request| {
            Ok(if request.prompt.contains(&marker) {
                "False".to_string()
            } else {
                "True".to_string()
            })
        })
    }

    /// Fails every call with an external service error.
    pub fn unavailable() -> Self {
        Self::new(|_| Err(ComplianceError::external("llm", "connection refused")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> ComplianceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        (self.responder)(request)
    }
}

/// Descriptor of a test corpus bound to `TEST_MODEL`.
pub fn descriptor(dimension: usize, metric: DistanceMetric) -> CorpusDescriptor {
    CorpusDescriptor {
        schema: "public".to_string(),
        table: "compliance_docs_test".to_string(),
        embedding_model: TEST_MODEL.to_string(),
        dimension,
        metric,
    }
}

/// Memory store over the given embedder, with the L2-squared metric.
pub fn memory_store(embedder: FixedEmbedder) -> Arc<dyn CorpusStore> {
    let dimension = embedder.dimension();
    Arc::new(MemoryCorpusStore::new(
        descriptor(dimension, DistanceMetric::L2Squared),
        Arc::new(embedder),
    ))
}

/// Initialize test logging (call once per test if needed)
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
