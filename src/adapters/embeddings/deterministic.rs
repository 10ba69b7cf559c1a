//! Deterministic embedding provider: derives dense and sparse vectors from
//! a SHA-256 digest of the input text. No network calls, so it is used by
//! the smoke binary and by tests that need a stable embedding without a
//! live provider.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::errors::SubstrateError;
use crate::domain::models::{DenseVector, SparseVector};
use crate::domain::ports::EmbeddingProvider;

pub struct DeterministicEmbeddingProvider {
    dense_dim: usize,
    sparse_vocab_size: usize,
}

impl DeterministicEmbeddingProvider {
    pub fn new(dense_dim: usize, sparse_vocab_size: usize) -> Self {
        Self { dense_dim, sparse_vocab_size }
    }

    fn digest_bytes(text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }

    fn dense_for(&self, text: &str) -> DenseVector {
        let digest = Self::digest_bytes(text);
        let values: Vec<f32> = (0..self.dense_dim)
            .map(|i| {
                let byte = digest[i % digest.len()];
                (f32::from(byte) / 127.5) - 1.0
            })
            .collect();
        DenseVector::normalized(values)
    }

    fn sparse_for(&self, text: &str) -> SparseVector {
        let mut sparse = SparseVector::new();
        for token in text.split_whitespace() {
            let digest = Self::digest_bytes(token);
            let token_id = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) % self.sparse_vocab_size as u32;
            let weight = 1.0 + (f32::from(digest[4]) / 255.0);
            let existing = sparse.get(token_id).unwrap_or(0.0);
            sparse.insert(token_id, existing + weight);
        }
        sparse
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    fn dense_dim(&self) -> usize {
        self.dense_dim
    }

    fn sparse_vocab_size(&self) -> usize {
        self.sparse_vocab_size
    }

    async fn embed_dense(&self, texts: &[String]) -> Result<Vec<DenseVector>, SubstrateError> {
        Ok(texts.iter().map(|t| self.dense_for(t)).collect())
    }

    async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>, SubstrateError> {
        Ok(texts.iter().map(|t| self.sparse_for(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_is_deterministic_across_calls() {
        let provider = DeterministicEmbeddingProvider::new(16, 1000);
        let a = provider.embed_dense(&["the quick brown fox".to_string()]).await.unwrap();
        let b = provider.embed_dense(&["the quick brown fox".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn distinct_texts_produce_distinct_dense_vectors() {
        let provider = DeterministicEmbeddingProvider::new(16, 1000);
        let a = provider.embed_dense(&["alpha".to_string()]).await.unwrap();
        let b = provider.embed_dense(&["beta".to_string()]).await.unwrap();
        assert_ne!(a[0], b[0]);
    }

    #[tokio::test]
    async fn sparse_vectors_are_sound() {
        let provider = DeterministicEmbeddingProvider::new(16, 1000);
        let sparse = provider.embed_sparse(&["alpha beta alpha".to_string()]).await.unwrap();
        assert!(sparse[0].is_sound(1000));
    }
}
