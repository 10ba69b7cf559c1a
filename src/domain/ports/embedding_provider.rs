//! Embedding capability port (§4.2, §4.3, §6).

use async_trait::async_trait;

use crate::domain::errors::SubstrateError;
use crate::domain::models::{DenseVector, SparseVector};

/// Capability port producing both the dense and sparse halves of the
/// hybrid index. A single provider covers both so corpus-wide sparse
/// vocabulary statistics (e.g. an IDF table) can stay consistent.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dense_dim(&self) -> usize;

    fn sparse_vocab_size(&self) -> usize;

    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<DenseVector>, SubstrateError>;

    async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>, SubstrateError>;
}
