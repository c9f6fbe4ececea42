//! Shared HTTP plumbing for external services
//!
//! Every outbound call (ingestion, chunking, embeddings, LLM) goes through
//! [`JsonServiceClient`], which applies a request timeout, the retry policy
//! and an optional rate limit.

pub mod client;
pub mod errors;
pub mod rate_limiter;
pub mod retry;

pub use client::{scrub_api_key, JsonServiceClient, ServiceClientConfig};
pub use errors::ServiceError;
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
