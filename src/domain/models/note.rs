//! Note domain model (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a note's evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    Web,
}

/// A citation-grade reference to the evidence a note draws on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    Document { doc_id: Uuid, chunk_id: Uuid },
    Web { url: String },
}

impl SourceRef {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Document { .. } => SourceType::Document,
            Self::Web { .. } => SourceType::Web,
        }
    }

    /// Canonical text form, which the note's stored content must cite
    /// verbatim (§3 invariant).
    pub fn citation_text(&self) -> String {
        match self {
            Self::Document { doc_id, chunk_id } => format!("doc:{doc_id}#chunk:{chunk_id}"),
            Self::Web { url } => url.clone(),
        }
    }
}

/// A cited, atomic finding produced by the Research Agent (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub note_id: Uuid,
    pub mission_id: Uuid,
    pub content: String,
    pub source_ref: SourceRef,
    pub section_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Builds a note, verifying the §3 invariant that `content` cites
    /// `source_ref` verbatim. Returns `None` if the citation is missing,
    /// so callers can treat that as a `ProviderContractError` (§7).
    pub fn try_new(mission_id: Uuid, content: impl Into<String>, source_ref: SourceRef, tags: Vec<String>) -> Option<Self> {
        let content = content.into();
        if !content.contains(&source_ref.citation_text()) {
            return None;
        }
        Some(Self {
            note_id: Uuid::new_v4(),
            mission_id,
            content,
            source_ref,
            section_id: None,
            tags,
            created_at: Utc::now(),
        })
    }

    /// Normalized form used for dedup: lowercased, whitespace-collapsed.
    pub fn normalized_content(&self) -> String {
        self.content.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// Dedup key: `(normalized_content, source_ref)` (§4.5).
    pub fn dedup_key(&self) -> (String, String) {
        (self.normalized_content(), self.source_ref.citation_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_rejects_content_without_citation() {
        let source = SourceRef::Web { url: "https://example.com/a".into() };
        let note = Note::try_new(Uuid::new_v4(), "this mentions nothing", source, vec![]);
        assert!(note.is_none());
    }

    #[test]
    fn try_new_accepts_content_with_verbatim_citation() {
        let source = SourceRef::Web { url: "https://example.com/a".into() };
        let note = Note::try_new(Uuid::new_v4(), "finding X per https://example.com/a", source, vec![]);
        assert!(note.is_some());
    }

    #[test]
    fn dedup_key_normalizes_whitespace_and_case() {
        let source = SourceRef::Web { url: "https://example.com/a".into() };
        let a = Note::try_new(Uuid::new_v4(), "Finding   X per https://example.com/a", source.clone(), vec![]).unwrap();
        let b = Note::try_new(Uuid::new_v4(), "finding x per https://example.com/a", source, vec![]).unwrap();
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn document_source_ref_citation_text_is_stable() {
        let doc_id = Uuid::new_v4();
        let chunk_id = Uuid::new_v4();
        let source = SourceRef::Document { doc_id, chunk_id };
        assert_eq!(source.citation_text(), format!("doc:{doc_id}#chunk:{chunk_id}"));
        assert_eq!(source.source_type(), SourceType::Document);
    }
}
