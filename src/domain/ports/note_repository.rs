//! Note Store persistence port (§3, §4.5).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Note;

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, note: &Note) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Note>>;

    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Note>>;

    async fn list_by_mission(&self, mission_id: Uuid) -> DomainResult<Vec<Note>>;

    async fn list_by_section(&self, mission_id: Uuid, section_id: Uuid) -> DomainResult<Vec<Note>>;

    /// Looks up an existing note with the same `(normalized_content,
    /// source_ref)` dedup key (§4.5) to avoid re-inserting duplicates.
    async fn find_duplicate(&self, mission_id: Uuid, normalized_content: &str, source_ref_text: &str) -> DomainResult<Option<Note>>;

    async fn assign_to_section(&self, note_id: Uuid, section_id: Uuid) -> DomainResult<()>;

    /// Clears a note's `section_id`, returning it to the unassigned pool
    /// without deleting it (§4.5).
    async fn unassign_from_section(&self, note_id: Uuid) -> DomainResult<()>;

    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
