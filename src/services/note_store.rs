//! Note Store (§4.5): dedup-on-insert wrapper around `NoteRepository`.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Note, Page};
use crate::domain::ports::NoteRepository;

pub struct NoteStore {
    repository: Arc<dyn NoteRepository>,
}

/// Outcome of `NoteStore::add`: either the note was newly inserted, or an
/// existing note with the same dedup key was returned instead (§4.5
/// "notes with identical (normalized_content, source_ref) are collapsed").
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Inserted(Note),
    Deduplicated(Note),
}

impl AddOutcome {
    pub fn note(&self) -> &Note {
        match self {
            Self::Inserted(n) | Self::Deduplicated(n) => n,
        }
    }
}

impl NoteStore {
    pub fn new(repository: Arc<dyn NoteRepository>) -> Self {
        Self { repository }
    }

    /// Inserts `note` unless a note with the same dedup key already
    /// exists for the mission, in which case the existing note is
    /// returned (§4.5 dedup rule).
    pub async fn add(&self, note: Note) -> DomainResult<AddOutcome> {
        let (normalized_content, source_ref_text) = note.dedup_key();
        if let Some(existing) = self.repository.find_duplicate(note.mission_id, &normalized_content, &source_ref_text).await? {
            return Ok(AddOutcome::Deduplicated(existing));
        }
        self.repository.create(&note).await?;
        Ok(AddOutcome::Inserted(note))
    }

    pub async fn list(&self, mission_id: Uuid, _page: Page) -> DomainResult<Vec<Note>> {
        self.repository.list_by_mission(mission_id).await
    }

    pub async fn list_by_section(&self, mission_id: Uuid, section_id: Uuid) -> DomainResult<Vec<Note>> {
        self.repository.list_by_section(mission_id, section_id).await
    }

    pub async fn assign(&self, note_id: Uuid, section_id: Uuid) -> DomainResult<()> {
        self.repository.assign_to_section(note_id, section_id).await
    }

    pub async fn unassign_all_for_section(&self, mission_id: Uuid, section_id: Uuid) -> DomainResult<()> {
        for note in self.repository.list_by_section(mission_id, section_id).await? {
            self.repository.unassign_from_section(note.note_id).await?;
        }
        Ok(())
    }

    pub async fn count(&self, mission_id: Uuid) -> DomainResult<usize> {
        Ok(self.repository.list_by_mission(mission_id).await?.len())
    }

    pub async fn get_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Note>> {
        self.repository.get_many(ids).await
    }
}
