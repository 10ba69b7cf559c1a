//! Document domain model (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source format of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Md,
    Txt,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Md => "md",
            Self::Txt => "txt",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "md" | "markdown" => Some(Self::Md),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Formats that pass through the converter unchanged (§4.3 step 4).
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::Md | Self::Txt)
    }
}

/// Processing status of a `Document` through the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Metadata extracted from the document body by the LLM-driven extraction
/// step (§4.3 step 5). All fields are best-effort; missing values are
/// tolerated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// An ingested source document (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub owner: String,
    pub filename: String,
    pub format: DocumentFormat,
    /// SHA-256 hex digest of the raw bytes. `(owner, content_hash)` is unique.
    pub content_hash: String,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
    pub processing_error: Option<String>,
    pub doc_group_id: Option<Uuid>,
    pub raw_blob_path: String,
    pub markdown_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(owner: impl Into<String>, filename: impl Into<String>, format: DocumentFormat, content_hash: String, raw_blob_path: String, doc_group_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            filename: filename.into(),
            format,
            content_hash,
            metadata: DocumentMetadata::default(),
            status: DocumentStatus::Processing,
            processing_error: None,
            doc_group_id,
            raw_blob_path,
            markdown_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_completed(&mut self, markdown_path: String) {
        self.markdown_path = Some(markdown_path);
        self.status = DocumentStatus::Completed;
        self.processing_error = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DocumentStatus::Failed;
        self.processing_error = Some(error.into());
        self.updated_at = Utc::now();
    }
}
