//! Client-side embedding providers.

pub mod openai;

pub use openai::OpenAiEmbeddingProvider;
