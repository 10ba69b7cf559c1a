//! Hybrid RAG Retriever (§4.2): dense + sparse fusion over the chunk
//! index. Follows an embed → candidate search → score → top-k
//! orchestration shape, implementing MAESTRO's own dense/sparse
//! convex-combination algorithm.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainResult, RagError};
use crate::domain::models::{Chunk, ChunkMetadata, HybridWeights};
use crate::domain::ports::{ChunkRepository, EmbeddingProvider};

/// One scored hit returned by `HybridRetriever::retrieve`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
    pub dense_cos_sim: f32,
}

#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    pub query_text: String,
    pub doc_group_id: Option<Uuid>,
    pub k: usize,
    pub weights: HybridWeights,
}

pub struct HybridRetriever {
    chunk_repository: Arc<dyn ChunkRepository>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl HybridRetriever {
    pub fn new(chunk_repository: Arc<dyn ChunkRepository>, embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { chunk_repository, embedding_provider }
    }

    /// Runs the §4.2 algorithm: embed the query, build dense and sparse
    /// candidate sets of size `Kd = Ks = max(50, 5*k)`, score their
    /// union by the convex combination of weights, and return the top
    /// `k` with a stable tie-break (higher dense cosine, then lower
    /// `chunk_id`).
    pub async fn retrieve(&self, query: RetrievalQuery) -> DomainResult<Vec<RetrievedChunk>> {
        if !query.weights.is_valid() {
            return Err(RagError::InvalidWeights { dense_w: query.weights.dense_w, sparse_w: query.weights.sparse_w }.into());
        }

        let dense_query = self
            .embedding_provider
            .embed_dense(std::slice::from_ref(&query.query_text))
            .await
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?
            .pop()
            .expect("embed_dense returns one vector per input text");
        let sparse_query = self
            .embedding_provider
            .embed_sparse(std::slice::from_ref(&query.query_text))
            .await
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?
            .pop()
            .expect("embed_sparse returns one vector per input text");

        if dense_query.dim() != self.embedding_provider.dense_dim() {
            return Err(RagError::DimensionMismatch { index_dim: self.embedding_provider.dense_dim(), query_dim: dense_query.dim() }.into());
        }

        let all_chunks = self.chunk_repository.list_for_retrieval(query.doc_group_id).await?;

        let candidate_pool_size = (5 * query.k).max(50);

        let mut dense_scored: Vec<(usize, f32)> = all_chunks.iter().enumerate().map(|(i, c)| (i, c.dense.cosine_similarity(&dense_query))).collect();
        dense_scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| all_chunks[a.0].id.cmp(&all_chunks[b.0].id)));
        let dense_candidates: Vec<usize> = dense_scored.into_iter().take(candidate_pool_size).map(|(i, _)| i).collect();

        let mut sparse_scored: Vec<(usize, f32)> = all_chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, sparse_score(&sparse_query, c)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        sparse_scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| all_chunks[a.0].id.cmp(&all_chunks[b.0].id)));
        let sparse_candidates: Vec<usize> = sparse_scored.iter().take(candidate_pool_size).map(|(i, _)| *i).collect();

        let mut union: Vec<usize> = dense_candidates.into_iter().chain(sparse_candidates).collect();
        union.sort_unstable();
        union.dedup();

        let all_sparse_scores: std::collections::HashMap<usize, f32> = sparse_scored.into_iter().collect();
        // Normalize over the union candidate set only (§4.2 step 4), not every
        // chunk with a nonzero sparse hit, so min/max reflect what's actually
        // being ranked rather than outliers elsewhere in the corpus.
        let candidate_sparse_scores: Vec<f32> = union.iter().map(|i| all_sparse_scores.get(i).copied().unwrap_or(0.0)).collect();
        let max_sparse = candidate_sparse_scores.iter().copied().fold(f32::MIN, f32::max);
        let min_sparse = candidate_sparse_scores.iter().copied().fold(f32::MAX, f32::min);
        let sparse_range = (max_sparse - min_sparse).max(f32::EPSILON);

        let mut scored: Vec<RetrievedChunk> = union
            .into_iter()
            .map(|i| {
                let chunk = &all_chunks[i];
                let dense_cos_sim = chunk.dense.cosine_similarity(&dense_query);
                let raw_sparse = all_sparse_scores.get(&i).copied().unwrap_or(0.0);
                let normalized_sparse = if candidate_sparse_scores.is_empty() { 0.0 } else { (raw_sparse - min_sparse) / sparse_range };
                let score = query.weights.dense_w * dense_cos_sim + query.weights.sparse_w * normalized_sparse;
                RetrievedChunk { chunk_id: chunk.id, doc_id: chunk.doc_id, text: chunk.text.clone(), metadata: chunk.metadata.clone(), score, dense_cos_sim }
            })
            .collect();

        // §4.2 step 6 tie-break: higher score, then higher dense cosine, then lower chunk_id.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| b.dense_cos_sim.total_cmp(&a.dense_cos_sim)).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
        scored.truncate(query.k);
        Ok(scored)
    }
}

fn sparse_score(query: &crate::domain::models::SparseVector, chunk: &Chunk) -> f32 {
    query.iter().filter_map(|(token_id, wq)| chunk.sparse.get(token_id).map(|wc| wq * wc)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::DeterministicEmbeddingProvider;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteChunkRepository, SqliteDocumentRepository};
    use crate::domain::models::{DenseVector, Document, DocumentFormat, SparseVector};
    use crate::domain::ports::{ChunkRepository as _, DocumentRepository};

    async fn retriever_with_chunks(texts: &[&str]) -> (HybridRetriever, Uuid) {
        let pool = create_migrated_test_pool().await.unwrap();
        let doc_repo = SqliteDocumentRepository::new(pool.clone());
        let chunk_repo: Arc<dyn ChunkRepository> = Arc::new(SqliteChunkRepository::new(pool));
        let provider = Arc::new(DeterministicEmbeddingProvider::new(16, 256));

        let mut doc = Document::new("alice", "doc.md", DocumentFormat::Md, "hash".into(), "/blobs/hash".into(), None);
        doc.mark_completed("/md/hash.md".into());
        doc_repo.create(&doc).await.unwrap();

        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let dense = provider.embed_dense(std::slice::from_ref(&text.to_string())).await.unwrap().pop().unwrap();
            let sparse = provider.embed_sparse(std::slice::from_ref(&text.to_string())).await.unwrap().pop().unwrap();
            chunks.push(Chunk::new(doc.id, i as u32, (*text).to_string(), dense, sparse, ChunkMetadata::default()));
        }
        chunk_repo.create_many(&chunks).await.unwrap();

        (HybridRetriever::new(chunk_repo, provider), doc.id)
    }

    #[tokio::test]
    async fn retrieve_rejects_invalid_weights() {
        let (retriever, _) = retriever_with_chunks(&["alpha beta"]).await;
        let query = RetrievalQuery { query_text: "alpha".into(), doc_group_id: None, k: 5, weights: HybridWeights { dense_w: 0.9, sparse_w: 0.9 } };
        let result = retriever.retrieve(query).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retrieve_returns_at_most_k_results() {
        let (retriever, _) = retriever_with_chunks(&["alpha beta", "gamma delta", "epsilon zeta"]).await;
        let query = RetrievalQuery { query_text: "alpha beta".into(), doc_group_id: None, k: 2, weights: HybridWeights::default() };
        let results = retriever.retrieve(query).await.unwrap();
        assert!(results.len() <= 2);
    }

    #[tokio::test]
    async fn retrieval_is_deterministic_given_identical_inputs() {
        let (retriever, _) = retriever_with_chunks(&["alpha beta", "gamma delta", "alpha gamma"]).await;
        let query = || RetrievalQuery { query_text: "alpha".into(), doc_group_id: None, k: 3, weights: HybridWeights::default() };
        let first = retriever.retrieve(query()).await.unwrap();
        let second = retriever.retrieve(query()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn pure_dense_weights_rank_by_cosine_similarity_only() {
        let (retriever, _) = retriever_with_chunks(&["alpha beta", "gamma delta"]).await;
        let weights = HybridWeights { dense_w: 1.0, sparse_w: 0.0 };
        let query = RetrievalQuery { query_text: "alpha beta".into(), doc_group_id: None, k: 2, weights };
        let results = retriever.retrieve(query).await.unwrap();
        assert!(results.windows(2).all(|w| w[0].dense_cos_sim >= w[1].dense_cos_sim));
    }

    #[test]
    fn sparse_score_sums_only_shared_tokens() {
        let mut q = SparseVector::new();
        q.insert(1, 0.5);
        q.insert(2, 0.3);
        let mut c_sparse = SparseVector::new();
        c_sparse.insert(1, 1.0);
        c_sparse.insert(3, 1.0);
        let chunk = Chunk::new(Uuid::new_v4(), 0, "t".into(), DenseVector::normalized(vec![1.0]), c_sparse, ChunkMetadata::default());
        let score = sparse_score(&q, &chunk);
        assert!((score - 0.5).abs() < 1e-6);
    }
}
