//! Domain-wide error taxonomy.
//!
//! Subsystem errors (`MissionError`, `RagError`, `IngestionError`, ...) are
//! narrow `thiserror` enums that classify transient vs. permanent
//! failures for retry decisions. They compose into `DomainError`, the
//! error type every port returns.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error returned by domain ports and services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("mission error: {0}")]
    Mission(#[from] MissionError),

    #[error("rag error: {0}")]
    Rag(#[from] RagError),

    #[error("ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors arising from mission lifecycle operations (§4.1, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MissionError {
    #[error("mission not found: {0}")]
    NotFound(Uuid),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("mission requires at least one of web-search or a document group")]
    NoSourcesConfigured,

    #[error("mission context is corrupt and cannot be rehydrated: {0}")]
    CorruptContext(String),

    #[error("persistence failure")]
    PersistenceFailure,

    #[error("mission was cancelled")]
    Cancelled,
}

impl MissionError {
    /// `PersistenceFailure` is the only mission-level error that escalates
    /// the mission itself to `failed` (§7); everything else degrades to a
    /// logged warning and the unit of work is skipped.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PersistenceFailure | Self::CorruptContext(_))
    }
}

/// Errors from the hybrid retriever (§4.2).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RagError {
    #[error("query embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("invalid hybrid weights: dense_w={dense_w}, sparse_w={sparse_w} must sum to 1.0")]
    InvalidWeights { dense_w: f32, sparse_w: f32 },

    #[error("index dimension mismatch: index is {index_dim}, query vector is {query_dim}")]
    DimensionMismatch { index_dim: usize, query_dim: usize },
}

/// Errors from the ingestion pipeline (§4.3).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestionError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document exceeds the configured size cap: {size} > {cap}")]
    TooLarge { size: u64, cap: u64 },

    #[error("duplicate document: owner already has this content at {existing_doc_id}")]
    Duplicate { existing_doc_id: Uuid },

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("metadata extraction failed: {0}")]
    MetadataExtractionFailed(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("ingestion was cancelled")]
    Cancelled,
}

/// Errors from the LLM/embedding/search/fetch external capabilities (§6, §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubstrateError {
    #[error("transient error (rate-limited, 5xx, or timeout): {0}")]
    Transient(String),

    #[error("context window overflow: needed {needed} tokens, limit {limit}")]
    ContextOverflow { needed: usize, limit: usize },

    #[error("provider returned output that did not match the requested schema: {0}")]
    ProviderContract(String),

    #[error("permanent error: {0}")]
    Permanent(String),
}

impl SubstrateError {
    /// §7 `TransientLLMError` classification: retried with backoff, then
    /// downgraded to a `warning` log once retries are exhausted.
    ///
    /// `ContextOverflow` is deliberately excluded: it gets its own
    /// trim-then-retry-once recovery (§7) rather than the generic
    /// backoff loop, since retrying with the same unmodified input would
    /// just overflow again.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::ProviderContract(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_error_persistence_failure_is_fatal() {
        assert!(MissionError::PersistenceFailure.is_fatal());
        assert!(!MissionError::NoSourcesConfigured.is_fatal());
    }

    #[test]
    fn substrate_error_transient_classification() {
        assert!(SubstrateError::Transient("rate limited".into()).is_transient());
        assert!(SubstrateError::ProviderContract("bad json".into()).is_transient());
        assert!(!SubstrateError::ContextOverflow { needed: 10, limit: 5 }.is_transient());
        assert!(!SubstrateError::Permanent("bad key".into()).is_transient());
    }

    #[test]
    fn domain_error_wraps_sqlx() {
        let err = DomainError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DomainError::Database(_)));
    }
}
