//! Configuration tree, deserialized by the figment loader.

use serde::{Deserialize, Serialize};

use super::retrieval::DistanceMetric;

/// Main configuration structure for regcheck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Corpus table configuration
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Similarity and lexical index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Document ingestion service
    #[serde(default = "default_ingestion_service")]
    pub ingestion: ServiceEndpointConfig,

    /// Chunking service
    #[serde(default = "default_chunking_service")]
    pub chunking: ServiceEndpointConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Judge configuration
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Pipeline execution configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            corpus: CorpusConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            ingestion: default_ingestion_service(),
            chunking: default_chunking_service(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            judge: JudgeConfig::default(),
            pipeline: PipelineConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Postgres connection URL (can also be set via `DATABASE_URL`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Corpus table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CorpusConfig {
    /// Schema holding the corpus table
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Corpus table name
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "compliance_documents".to_string()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            table: default_table(),
        }
    }
}

/// Where embeddings are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// The database embeds rows through a registered job and embeds queries inline
    #[default]
    Database,
    /// The client calls the embedding API and writes vectors itself
    Client,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Embedding mode
    #[serde(default)]
    pub mode: EmbeddingMode,

    /// Model identifier, recorded with the corpus and asserted at query time
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality of the model
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Base URL of the OpenAI-compatible embeddings API (client mode)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// API key (can also be set via `OPENAI_API_KEY`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum texts per embeddings request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "openai/text-embedding-3-small".to_string()
}

const fn default_dimension() -> usize {
    1536
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_embedding_batch_size() -> usize {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: default_openai_base_url(),
            api_key: None,
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_service_timeout(),
        }
    }
}

/// Index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IndexConfig {
    /// Access method of the approximate nearest-neighbor index
    #[serde(default = "default_index_type")]
    pub index_type: String,

    /// Distance metric used by the index and by queries
    #[serde(default)]
    pub metric: DistanceMetric,

    /// HNSW graph degree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<u32>,

    /// HNSW construction candidate list size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef_construction: Option<u32>,

    /// HNSW search candidate list size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef: Option<u32>,

    /// Text search configuration of the lexical index
    #[serde(default = "default_text_search_config")]
    pub text_search_config: String,
}

fn default_index_type() -> String {
    "lantern_hnsw".to_string()
}

fn default_text_search_config() -> String {
    "english".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_type: default_index_type(),
            metric: DistanceMetric::default(),
            m: None,
            ef_construction: None,
            ef: None,
            text_search_config: default_text_search_config(),
        }
    }
}

/// HTTP endpoint of an external document-processing service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceEndpointConfig {
    /// Base URL of the service
    pub base_url: String,

    /// Bearer token, if the service requires one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

const fn default_service_timeout() -> u64 {
    120
}

fn default_ingestion_service() -> ServiceEndpointConfig {
    ServiceEndpointConfig {
        base_url: "http://localhost:8080".to_string(),
        api_key: None,
        timeout_secs: 300,
    }
}

fn default_chunking_service() -> ServiceEndpointConfig {
    ServiceEndpointConfig {
        base_url: "http://localhost:8080".to_string(),
        api_key: None,
        timeout_secs: default_service_timeout(),
    }
}

/// Supported LLM back ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    /// OpenAI-compatible chat completions
    #[default]
    Openai,
    /// Anthropic Messages API
    Anthropic,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Provider
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Base URL override (for proxies and tests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (falls back to `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum tokens in the answer
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

const fn default_llm_max_tokens() -> u32 {
    8
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            max_tokens: default_llm_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_service_timeout(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Number of nearest chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Judge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgeConfig {
    /// Minimum number of retrieved chunks required to judge a query
    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,

    /// Include chunk text in the prompt, not just chunk ids
    #[serde(default = "default_true")]
    pub include_chunk_text: bool,
}

const fn default_min_chunks() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            min_chunks: default_min_chunks(),
            include_chunk_text: true,
        }
    }
}

/// Pipeline execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Maximum number of queries processed concurrently (1-64)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Abort the whole run on the first failed query
    #[serde(default)]
    pub fail_fast: bool,
}

const fn default_concurrency() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fail_fast: false,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

const fn default_requests_per_second() -> f64 {
    5.0
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation of file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
