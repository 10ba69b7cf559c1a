//! Logging infrastructure
//!
//! Structured logging via tracing/tracing-subscriber: JSON or pretty output,
//! optional rolling file layer, and a secret-scrubbing helper for redacting
//! provider credentials before they reach a sink.

mod config;
mod logger;
mod secret_scrubbing;

pub use config::{LogFormat, LoggingConfig, RotationPolicy};
pub use logger::LoggerImpl;
pub use secret_scrubbing::SecretScrubbingLayer;
