//! Embedding provider adapters.

pub mod deterministic;

pub use deterministic::DeterministicEmbeddingProvider;
