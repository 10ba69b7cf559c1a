//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Validation against `ResearchConfig::validate`

mod loader;

pub use loader::ConfigLoader;
