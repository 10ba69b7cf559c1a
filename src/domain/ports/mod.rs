//! Port traits: the boundary between domain logic and adapters.

pub mod chunk_repository;
pub mod document_converter;
pub mod document_repository;
pub mod embedding_provider;
pub mod execution_log_repository;
pub mod fetcher;
pub mod llm_substrate;
pub mod mission_repository;
pub mod note_repository;
pub mod report_version_repository;
pub mod searcher;

pub use chunk_repository::ChunkRepository;
pub use document_converter::DocumentConverter;
pub use document_repository::{DocumentFilter, DocumentRepository};
pub use embedding_provider::EmbeddingProvider;
pub use execution_log_repository::ExecutionLogRepository;
pub use fetcher::{FetchEngine, FetchFormat, FetchOptions, FetchedPage, Fetcher};
pub use llm_substrate::{ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmSubstrate};
pub use mission_repository::{MissionFilter, MissionRepository};
pub use note_repository::NoteRepository;
pub use report_version_repository::ReportVersionRepository;
pub use searcher::{Searcher, WebSearchResult};
