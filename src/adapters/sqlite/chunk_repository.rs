//! SQLite implementation of `ChunkRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, ChunkMetadata, DenseVector, SparseVector};
use crate::domain::ports::ChunkRepository;

#[derive(Clone)]
pub struct SqliteChunkRepository {
    pool: SqlitePool,
}

impl SqliteChunkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    id: String,
    doc_id: String,
    chunk_index: i64,
    text: String,
    dense: String,
    sparse: String,
    metadata: String,
}

impl TryFrom<ChunkRow> for Chunk {
    type Error = DomainError;

    fn try_from(row: ChunkRow) -> Result<Self, Self::Error> {
        let dense_values: Vec<f32> = super::parse_json(&row.dense)?;
        let sparse_pairs: Vec<(u32, f32)> = super::parse_json(&row.sparse)?;
        let metadata: ChunkMetadata = super::parse_json(&row.metadata)?;
        Ok(Chunk {
            id: super::parse_uuid(&row.id)?,
            doc_id: super::parse_uuid(&row.doc_id)?,
            chunk_index: row.chunk_index as u32,
            text: row.text,
            dense: DenseVector::normalized(dense_values),
            sparse: SparseVector::from_pairs(sparse_pairs),
            metadata,
        })
    }
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn create_many(&self, chunks: &[Chunk]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            let dense_json = serde_json::to_string(chunk.dense.as_slice())?;
            let sparse_json = serde_json::to_string(&chunk.sparse.iter().collect::<Vec<_>>())?;
            let metadata_json = serde_json::to_string(&chunk.metadata)?;

            sqlx::query(
                r#"INSERT INTO chunks (id, doc_id, chunk_index, text, dense, sparse, metadata)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(chunk.id.to_string())
            .bind(chunk.doc_id.to_string())
            .bind(i64::from(chunk.chunk_index))
            .bind(&chunk.text)
            .bind(&dense_json)
            .bind(&sparse_json)
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Chunk>> {
        let row: Option<ChunkRow> = sqlx::query_as("SELECT * FROM chunks WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool).await?;
        row.map(Chunk::try_from).transpose()
    }

    async fn list_by_document(&self, doc_id: Uuid) -> DomainResult<Vec<Chunk>> {
        let rows: Vec<ChunkRow> =
            sqlx::query_as("SELECT * FROM chunks WHERE doc_id = ? ORDER BY chunk_index").bind(doc_id.to_string()).fetch_all(&self.pool).await?;
        rows.into_iter().map(Chunk::try_from).collect()
    }

    async fn list_for_retrieval(&self, doc_group_id: Option<Uuid>) -> DomainResult<Vec<Chunk>> {
        let rows: Vec<ChunkRow> = match doc_group_id {
            Some(group_id) => {
                sqlx::query_as("SELECT c.* FROM chunks c INNER JOIN documents d ON c.doc_id = d.id WHERE d.doc_group_id = ? AND d.status = 'completed'")
                    .bind(group_id.to_string())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT c.* FROM chunks c INNER JOIN documents d ON c.doc_id = d.id WHERE d.status = 'completed'")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(Chunk::try_from).collect()
    }

    async fn delete_by_document(&self, doc_id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM chunks WHERE doc_id = ?").bind(doc_id.to_string()).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{Document, DocumentFormat};

    async fn setup() -> (SqliteChunkRepository, SqlitePool) {
        let pool = create_migrated_test_pool().await.unwrap();
        (SqliteChunkRepository::new(pool.clone()), pool)
    }

    async fn completed_document(pool: &SqlitePool) -> Document {
        let mut doc = Document::new("alice", "a.pdf", DocumentFormat::Pdf, "h".into(), "/b".into(), None);
        doc.mark_completed("/md/a.md".into());
        sqlx::query(
            r#"INSERT INTO documents (id, owner, filename, format, content_hash, metadata, status, processing_error, doc_group_id, raw_blob_path, markdown_path, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(doc.id.to_string())
        .bind(&doc.owner)
        .bind(&doc.filename)
        .bind(doc.format.as_str())
        .bind(&doc.content_hash)
        .bind(serde_json::to_string(&doc.metadata).unwrap())
        .bind(doc.status.as_str())
        .bind(&doc.processing_error)
        .bind(doc.doc_group_id.map(|id| id.to_string()))
        .bind(&doc.raw_blob_path)
        .bind(&doc.markdown_path)
        .bind(doc.created_at.to_rfc3339())
        .bind(doc.updated_at.to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        doc
    }

    #[tokio::test]
    async fn create_many_and_list_by_document_preserves_order() {
        let (repo, pool) = setup().await;
        let doc = completed_document(&pool).await;

        let chunks = vec![
            Chunk::new(doc.id, 0, "first".into(), DenseVector::normalized(vec![1.0, 0.0]), SparseVector::new(), ChunkMetadata::default()),
            Chunk::new(doc.id, 1, "second".into(), DenseVector::normalized(vec![0.0, 1.0]), SparseVector::new(), ChunkMetadata::default()),
        ];
        repo.create_many(&chunks).await.unwrap();

        let fetched = repo.list_by_document(doc.id).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].text, "first");
        assert_eq!(fetched[1].text, "second");
    }

    #[tokio::test]
    async fn list_for_retrieval_only_returns_completed_documents() {
        let (repo, pool) = setup().await;
        let doc = completed_document(&pool).await;
        let chunks = vec![Chunk::new(doc.id, 0, "t".into(), DenseVector::normalized(vec![1.0]), SparseVector::new(), ChunkMetadata::default())];
        repo.create_many(&chunks).await.unwrap();

        let retrievable = repo.list_for_retrieval(None).await.unwrap();
        assert_eq!(retrievable.len(), 1);
    }
}
