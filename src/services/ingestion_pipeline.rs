//! Hybrid RAG Ingestion pipeline (§4.3): validate → dedup → persist raw →
//! convert → extract metadata → chunk → embed → store → finalize.
//!
//! A chunk-then-embed-then-index shape, generalized to the full
//! nine-step pipeline and content-addressed dedup this system requires.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, IngestionError};
use crate::domain::models::{Chunk, ChunkMetadata, ChunkWindow, Document, DocumentFormat, DocumentMetadata, RagConfig};
use crate::domain::ports::{ChatMessage, ChatRequest, ChatRole, ChunkRepository, DocumentConverter, DocumentRepository, EmbeddingProvider, LlmSubstrate};
use crate::domain::models::ModelTier;

pub struct IngestRequest {
    pub owner: String,
    pub filename: String,
    pub format: DocumentFormat,
    pub raw: Vec<u8>,
    pub doc_group_id: Option<Uuid>,
}

pub struct IngestionPipeline {
    document_repository: Arc<dyn DocumentRepository>,
    chunk_repository: Arc<dyn ChunkRepository>,
    converter: Arc<dyn DocumentConverter>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    llm_substrate: Arc<dyn LlmSubstrate>,
    config: RagConfig,
}

impl IngestionPipeline {
    pub fn new(
        document_repository: Arc<dyn DocumentRepository>,
        chunk_repository: Arc<dyn ChunkRepository>,
        converter: Arc<dyn DocumentConverter>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm_substrate: Arc<dyn LlmSubstrate>,
        config: RagConfig,
    ) -> Self {
        Self { document_repository, chunk_repository, converter, embedding_provider, llm_substrate, config }
    }

    /// Runs the full §4.3 pipeline for one uploaded file.
    pub async fn ingest(&self, request: IngestRequest, cancel: &CancellationToken) -> DomainResult<Document> {
        if !self.converter.supports(request.format) {
            return Err(IngestionError::UnsupportedFormat(request.format.as_str().to_string()).into());
        }
        let size = request.raw.len() as u64;
        if size > self.config.max_document_bytes {
            return Err(IngestionError::TooLarge { size, cap: self.config.max_document_bytes }.into());
        }

        let content_hash = hex::encode(Sha256::digest(&request.raw));

        if let Some(existing) = self.document_repository.find_by_content_hash(&request.owner, &content_hash).await? {
            return Err(IngestionError::Duplicate { existing_doc_id: existing.id }.into());
        }

        let raw_blob_path = format!("blobs/{content_hash}");
        let mut document = Document::new(request.owner, request.filename, request.format, content_hash.clone(), raw_blob_path, request.doc_group_id);
        match self.document_repository.create(&document).await {
            Ok(()) => {}
            Err(DomainError::Ingestion(IngestionError::Duplicate { existing_doc_id })) => {
                return Err(IngestionError::Duplicate { existing_doc_id }.into());
            }
            Err(e) => return Err(e),
        }

        if let Err(err) = self.process(&mut document, &request.raw, cancel).await {
            let message = match &err {
                DomainError::Ingestion(IngestionError::Cancelled) => "cancelled".to_string(),
                other => other.to_string(),
            };
            document.mark_failed(message);
            self.document_repository.update(&document).await?;
            return Err(err);
        }

        Ok(document)
    }

    async fn process(&self, document: &mut Document, raw: &[u8], cancel: &CancellationToken) -> DomainResult<()> {
        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled.into());
        }

        let markdown = self.converter.convert(document.format, raw).await.map_err(DomainError::from)?;

        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled.into());
        }
        document.metadata = self.extract_metadata(&markdown).await;

        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled.into());
        }
        let chunks = self.chunk_and_embed(document.id, &markdown, cancel).await?;

        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled.into());
        }
        self.chunk_repository.create_many(&chunks).await?;

        let markdown_path = format!("markdown/{}.md", document.content_hash);
        document.mark_completed(markdown_path);
        self.document_repository.update(document).await?;
        Ok(())
    }

    /// §4.3 step 5: best-effort metadata extraction. A parse failure
    /// leaves `DocumentMetadata::default()` rather than failing ingestion
    /// ("tolerate missing fields").
    async fn extract_metadata(&self, markdown: &str) -> DocumentMetadata {
        let excerpt: String = markdown.chars().take(self.config.metadata_extraction_chars).collect();
        let request = ChatRequest {
            tier: ModelTier::Fast,
            messages: vec![
                ChatMessage { role: ChatRole::System, content: "Extract title, authors, year, abstract, and keywords as JSON matching the given schema. Omit fields you cannot determine.".into() },
                ChatMessage { role: ChatRole::User, content: excerpt },
            ],
            expects_variant: None,
            max_output_tokens: Some(512),
        };
        match self.llm_substrate.chat(request).await {
            Ok(response) => serde_json::from_str(&response.content).unwrap_or_default(),
            Err(_) => DocumentMetadata::default(),
        }
    }

    /// §4.3 steps 6-7: chunk into paragraph windows, then embed in
    /// batches of `embedding_batch_size`.
    async fn chunk_and_embed(&self, doc_id: Uuid, markdown: &str, cancel: &CancellationToken) -> DomainResult<Vec<Chunk>> {
        let windows = chunk_markdown(markdown, self.config.chunk_window);
        let mut chunks = Vec::with_capacity(windows.len());

        for (batch_index, batch) in windows.chunks(self.config.embedding_batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(IngestionError::Cancelled.into());
            }
            let texts: Vec<String> = batch.to_vec();
            let dense = self.embedding_provider.embed_dense(&texts).await.map_err(|e| IngestionError::EmbeddingFailed(e.to_string()))?;
            let sparse = self.embedding_provider.embed_sparse(&texts).await.map_err(|e| IngestionError::EmbeddingFailed(e.to_string()))?;

            for (i, ((text, dense_vec), sparse_vec)) in texts.into_iter().zip(dense).zip(sparse).enumerate() {
                let chunk_index = (batch_index * self.config.embedding_batch_size + i) as u32;
                chunks.push(Chunk::new(doc_id, chunk_index, text, dense_vec, sparse_vec, ChunkMetadata::default()));
            }
        }
        Ok(chunks)
    }

    /// `force_reembed` (§4.3): deletes existing chunks and reruns steps
    /// 6-9 from already-converted markdown, preserving `doc_id` and
    /// metadata but possibly renumbering chunks from zero.
    pub async fn force_reembed(&self, document: &mut Document, markdown: &str, cancel: &CancellationToken) -> DomainResult<()> {
        self.chunk_repository.delete_by_document(document.id).await?;
        let chunks = self.chunk_and_embed(document.id, markdown, cancel).await?;
        self.chunk_repository.create_many(&chunks).await?;
        document.mark_completed(format!("markdown/{}.md", document.content_hash));
        self.document_repository.update(document).await?;
        Ok(())
    }
}

/// §4.3 step 6: windows of `window_paragraphs` paragraphs, striding by
/// `stride_paragraphs`, empty paragraphs skipped before windowing.
pub fn chunk_markdown(markdown: &str, window: ChunkWindow) -> Vec<String> {
    let paragraphs: Vec<&str> = markdown.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect();
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let stride = window.stride_paragraphs.max(1);
    let window_size = window.window_paragraphs.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < paragraphs.len() {
        let end = (start + window_size).min(paragraphs.len());
        chunks.push(paragraphs[start..end].join("\n\n"));
        if end == paragraphs.len() {
            break;
        }
        start += stride;
    }
    chunks
}
