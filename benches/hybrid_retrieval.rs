//! Benchmarks the hybrid retriever's `retrieve` call across corpus sizes
//! and `k` values, backed by an in-memory SQLite chunk index and the
//! deterministic (network-free) embedding provider.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;
use uuid::Uuid;

use maestro_core::adapters::embeddings::DeterministicEmbeddingProvider;
use maestro_core::adapters::sqlite::{create_migrated_test_pool, SqliteChunkRepository};
use maestro_core::domain::models::{Chunk, ChunkMetadata, HybridWeights};
use maestro_core::domain::ports::{ChunkRepository, EmbeddingProvider};
use maestro_core::services::{HybridRetriever, RetrievalQuery};

const DENSE_DIM: usize = 32;
const SPARSE_VOCAB: usize = 256;

async fn seeded_retriever(corpus_size: usize) -> HybridRetriever {
    let pool = create_migrated_test_pool().await.expect("failed to create in-memory pool");
    let chunk_repository: Arc<dyn ChunkRepository> = Arc::new(SqliteChunkRepository::new(pool));
    let embedding_provider = Arc::new(DeterministicEmbeddingProvider::new(DENSE_DIM, SPARSE_VOCAB));

    let doc_id = Uuid::new_v4();
    let mut chunks = Vec::with_capacity(corpus_size);
    for i in 0..corpus_size {
        let text = format!("chunk number {i} discusses topic area {}", i % 37);
        let dense = embedding_provider.embed_dense(std::slice::from_ref(&text)).await.unwrap().pop().unwrap();
        let sparse = embedding_provider.embed_sparse(std::slice::from_ref(&text)).await.unwrap().pop().unwrap();
        chunks.push(Chunk::new(doc_id, i as u32, text, dense, sparse, ChunkMetadata::default()));
    }
    chunk_repository.create_many(&chunks).await.expect("failed to seed chunks");

    HybridRetriever::new(chunk_repository, embedding_provider)
}

fn bench_retrieve(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("hybrid_retrieve");

    for corpus_size in [100usize, 1_000, 5_000] {
        let retriever = rt.block_on(seeded_retriever(corpus_size));
        for k in [5usize, 20] {
            group.bench_with_input(BenchmarkId::new(format!("corpus_{corpus_size}"), k), &k, |b, &k| {
                b.to_async(&rt).iter(|| {
                    let query = RetrievalQuery { query_text: "topic area 12".to_string(), doc_group_id: None, k, weights: HybridWeights::default() };
                    let retriever = &retriever;
                    async move { retriever.retrieve(query).await.unwrap() }
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_retrieve);
criterion_main!(benches);
