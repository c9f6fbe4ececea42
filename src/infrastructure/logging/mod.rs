//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output on stderr
//! - Optional JSON log files with rotation via tracing-appender

pub mod config;
pub mod logger;

pub use config::{parse_log_level, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
