//! Chunk index persistence port (§3, §4.2, §4.3).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Chunk;

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Bulk-inserts chunks produced for one document (§4.3 step 6).
    async fn create_many(&self, chunks: &[Chunk]) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Chunk>>;

    async fn list_by_document(&self, doc_id: Uuid) -> DomainResult<Vec<Chunk>>;

    /// Candidate set for hybrid retrieval, scoped to a document group if
    /// one is set on the mission (§4.2).
    async fn list_for_retrieval(&self, doc_group_id: Option<Uuid>) -> DomainResult<Vec<Chunk>>;

    async fn delete_by_document(&self, doc_id: Uuid) -> DomainResult<()>;
}
