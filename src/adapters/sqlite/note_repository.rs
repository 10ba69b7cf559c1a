//! SQLite implementation of `NoteRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Note, SourceRef};
use crate::domain::ports::NoteRepository;

#[derive(Clone)]
pub struct SqliteNoteRepository {
    pool: SqlitePool,
}

impl SqliteNoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    note_id: String,
    mission_id: String,
    content: String,
    source_ref: String,
    section_id: Option<String>,
    tags: String,
    created_at: String,
}

impl TryFrom<NoteRow> for Note {
    type Error = DomainError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let source_ref: SourceRef = super::parse_json(&row.source_ref)?;
        Ok(Note {
            note_id: super::parse_uuid(&row.note_id)?,
            mission_id: super::parse_uuid(&row.mission_id)?,
            content: row.content,
            source_ref,
            section_id: super::parse_optional_uuid(row.section_id)?,
            tags: super::parse_json(&row.tags)?,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn create(&self, note: &Note) -> DomainResult<()> {
        let source_ref_json = serde_json::to_string(&note.source_ref)?;
        let tags_json = serde_json::to_string(&note.tags)?;

        sqlx::query(
            r#"INSERT INTO notes (note_id, mission_id, content, source_ref, section_id, tags, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(note.note_id.to_string())
        .bind(note.mission_id.to_string())
        .bind(&note.content)
        .bind(&source_ref_json)
        .bind(note.section_id.map(|id| id.to_string()))
        .bind(&tags_json)
        .bind(note.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Note>> {
        let row: Option<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE note_id = ?").bind(id.to_string()).fetch_optional(&self.pool).await?;
        row.map(Note::try_from).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> DomainResult<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let query = format!("SELECT * FROM notes WHERE note_id IN ({placeholders})");
        let mut q = sqlx::query_as::<_, NoteRow>(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }
        let rows: Vec<NoteRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Note::try_from).collect()
    }

    async fn list_by_mission(&self, mission_id: Uuid) -> DomainResult<Vec<Note>> {
        let rows: Vec<NoteRow> =
            sqlx::query_as("SELECT * FROM notes WHERE mission_id = ? ORDER BY created_at").bind(mission_id.to_string()).fetch_all(&self.pool).await?;
        rows.into_iter().map(Note::try_from).collect()
    }

    async fn list_by_section(&self, mission_id: Uuid, section_id: Uuid) -> DomainResult<Vec<Note>> {
        let rows: Vec<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE mission_id = ? AND section_id = ? ORDER BY created_at")
            .bind(mission_id.to_string())
            .bind(section_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Note::try_from).collect()
    }

    async fn find_duplicate(&self, mission_id: Uuid, normalized_content: &str, source_ref_text: &str) -> DomainResult<Option<Note>> {
        let rows: Vec<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE mission_id = ?").bind(mission_id.to_string()).fetch_all(&self.pool).await?;

        for row in rows {
            let note = Note::try_from(row)?;
            if note.normalized_content() == normalized_content && note.source_ref.citation_text() == source_ref_text {
                return Ok(Some(note));
            }
        }
        Ok(None)
    }

    async fn assign_to_section(&self, note_id: Uuid, section_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE notes SET section_id = ? WHERE note_id = ?")
            .bind(section_id.to_string())
            .bind(note_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("note {note_id}")));
        }
        Ok(())
    }

    async fn unassign_from_section(&self, note_id: Uuid) -> DomainResult<()> {
        sqlx::query("UPDATE notes SET section_id = NULL WHERE note_id = ?").bind(note_id.to_string()).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM notes WHERE note_id = ?").bind(id.to_string()).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteNoteRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteNoteRepository::new(pool)
    }

    fn sample_note(mission_id: Uuid) -> Note {
        let source = SourceRef::Web { url: "https://example.com/a".into() };
        Note::try_new(mission_id, "finding X per https://example.com/a", source, vec!["economics".into()]).unwrap()
    }

    #[tokio::test]
    async fn create_and_get_roundtrips() {
        let repo = setup().await;
        let note = sample_note(Uuid::new_v4());
        repo.create(&note).await.unwrap();

        let fetched = repo.get(note.note_id).await.unwrap().unwrap();
        assert_eq!(fetched.content, note.content);
        assert_eq!(fetched.tags, vec!["economics".to_string()]);
    }

    #[tokio::test]
    async fn find_duplicate_matches_on_normalized_content_and_source() {
        let repo = setup().await;
        let mission_id = Uuid::new_v4();
        let note = sample_note(mission_id);
        repo.create(&note).await.unwrap();

        let found = repo.find_duplicate(mission_id, &note.normalized_content(), &note.source_ref.citation_text()).await.unwrap();
        assert!(found.is_some());

        let not_found = repo.find_duplicate(mission_id, "completely different text", &note.source_ref.citation_text()).await.unwrap();
        assert!(not_found.is_none());
    }

    #[tokio::test]
    async fn assign_to_section_updates_row() {
        let repo = setup().await;
        let note = sample_note(Uuid::new_v4());
        repo.create(&note).await.unwrap();

        let section_id = Uuid::new_v4();
        repo.assign_to_section(note.note_id, section_id).await.unwrap();

        let fetched = repo.get(note.note_id).await.unwrap().unwrap();
        assert_eq!(fetched.section_id, Some(section_id));
    }

    #[tokio::test]
    async fn unassign_from_section_clears_the_link_without_deleting() {
        let repo = setup().await;
        let note = sample_note(Uuid::new_v4());
        repo.create(&note).await.unwrap();

        let section_id = Uuid::new_v4();
        repo.assign_to_section(note.note_id, section_id).await.unwrap();
        repo.unassign_from_section(note.note_id).await.unwrap();

        let fetched = repo.get(note.note_id).await.unwrap().unwrap();
        assert_eq!(fetched.section_id, None);
        assert_eq!(fetched.content, note.content);
    }
}
