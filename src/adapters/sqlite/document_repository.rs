//! SQLite implementation of `DocumentRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Document, DocumentFormat, DocumentMetadata, DocumentStatus};
use crate::domain::ports::{DocumentFilter, DocumentRepository};

#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    owner: String,
    filename: String,
    format: String,
    content_hash: String,
    metadata: String,
    status: String,
    processing_error: Option<String>,
    doc_group_id: Option<String>,
    raw_blob_path: String,
    markdown_path: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DomainError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let format = DocumentFormat::from_str(&row.format).ok_or_else(|| DomainError::Serialization(format!("invalid document format: {}", row.format)))?;
        let status = DocumentStatus::from_str(&row.status).ok_or_else(|| DomainError::Serialization(format!("invalid document status: {}", row.status)))?;
        let metadata: DocumentMetadata = super::parse_json(&row.metadata)?;
        Ok(Document {
            id: super::parse_uuid(&row.id)?,
            owner: row.owner,
            filename: row.filename,
            format,
            content_hash: row.content_hash,
            metadata,
            status,
            processing_error: row.processing_error,
            doc_group_id: super::parse_optional_uuid(row.doc_group_id)?,
            raw_blob_path: row.raw_blob_path,
            markdown_path: row.markdown_path,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn create(&self, document: &Document) -> DomainResult<()> {
        let metadata_json = serde_json::to_string(&document.metadata)?;

        sqlx::query(
            r#"INSERT INTO documents (id, owner, filename, format, content_hash, metadata, status, processing_error, doc_group_id, raw_blob_path, markdown_path, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(document.id.to_string())
        .bind(&document.owner)
        .bind(document.filename.clone())
        .bind(document.format.as_str())
        .bind(&document.content_hash)
        .bind(&metadata_json)
        .bind(document.status.as_str())
        .bind(&document.processing_error)
        .bind(document.doc_group_id.map(|id| id.to_string()))
        .bind(&document.raw_blob_path)
        .bind(&document.markdown_path)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => DomainError::Ingestion(crate::domain::errors::IngestionError::Duplicate { existing_doc_id: document.id }),
            other => DomainError::from(other),
        })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool).await?;
        row.map(Document::try_from).transpose()
    }

    async fn update(&self, document: &Document) -> DomainResult<()> {
        let metadata_json = serde_json::to_string(&document.metadata)?;

        let result = sqlx::query(
            r#"UPDATE documents SET metadata = ?, status = ?, processing_error = ?, markdown_path = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(&metadata_json)
        .bind(document.status.as_str())
        .bind(&document.processing_error)
        .bind(&document.markdown_path)
        .bind(document.updated_at.to_rfc3339())
        .bind(document.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("document {}", document.id)));
        }
        Ok(())
    }

    async fn list(&self, filter: DocumentFilter) -> DomainResult<Vec<Document>> {
        let mut query = String::from("SELECT * FROM documents WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(owner) = &filter.owner {
            query.push_str(" AND owner = ?");
            bindings.push(owner.clone());
        }
        if let Some(doc_group_id) = filter.doc_group_id {
            query.push_str(" AND doc_group_id = ?");
            bindings.push(doc_group_id.to_string());
        }
        if let Some(status) = filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, DocumentRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<DocumentRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn find_by_content_hash(&self, owner: &str, content_hash: &str) -> DomainResult<Option<Document>> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE owner = ? AND content_hash = ?").bind(owner).bind(content_hash).fetch_optional(&self.pool).await?;
        row.map(Document::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?").bind(id.to_string()).execute(&self.pool).await?;
        Ok(())
    }
}
