//! Document metadata persistence port (§3, §4.3).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Document, DocumentStatus};

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub owner: Option<String>,
    pub doc_group_id: Option<Uuid>,
    pub status: Option<DocumentStatus>,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: &Document) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>>;

    async fn update(&self, document: &Document) -> DomainResult<()>;

    async fn list(&self, filter: DocumentFilter) -> DomainResult<Vec<Document>>;

    /// Looks up `(owner, content_hash)` for the content-addressed dedup
    /// check performed at ingestion time (§4.3 step 2).
    async fn find_by_content_hash(&self, owner: &str, content_hash: &str) -> DomainResult<Option<Document>>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
