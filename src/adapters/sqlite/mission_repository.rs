//! SQLite implementation of `MissionRepository`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Mission, MissionContext, MissionOptions, MissionStatus};
use crate::domain::ports::{MissionFilter, MissionRepository};

#[derive(Clone)]
pub struct SqliteMissionRepository {
    pool: SqlitePool,
}

impl SqliteMissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MissionRow {
    id: String,
    chat_id: String,
    request_text: String,
    status: String,
    options: String,
    current_report_version: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MissionRow> for Mission {
    type Error = DomainError;

    fn try_from(row: MissionRow) -> Result<Self, Self::Error> {
        let status = MissionStatus::from_str(&row.status).ok_or_else(|| DomainError::Serialization(format!("invalid mission status: {}", row.status)))?;
        let options: MissionOptions = super::parse_json(&row.options)?;
        Ok(Mission {
            id: super::parse_uuid(&row.id)?,
            chat_id: super::parse_uuid(&row.chat_id)?,
            request_text: row.request_text,
            status,
            options,
            current_report_version: row.current_report_version.map(|v| v as u32),
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MissionContextRow {
    schema_version: i64,
    context: String,
}

#[async_trait]
impl MissionRepository for SqliteMissionRepository {
    async fn create(&self, mission: &Mission, context: &MissionContext) -> DomainResult<()> {
        let options_json = serde_json::to_string(&mission.options)?;

        sqlx::query(
            r#"INSERT INTO missions (id, chat_id, request_text, status, options, current_report_version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(mission.id.to_string())
        .bind(mission.chat_id.to_string())
        .bind(&mission.request_text)
        .bind(mission.status.as_str())
        .bind(&options_json)
        .bind(mission.current_report_version.map(i64::from))
        .bind(mission.created_at.to_rfc3339())
        .bind(mission.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.save_context(mission.id, context).await
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Mission>> {
        let row: Option<MissionRow> = sqlx::query_as("SELECT * FROM missions WHERE id = ?").bind(id.to_string()).fetch_optional(&self.pool).await?;
        row.map(Mission::try_from).transpose()
    }

    async fn update(&self, mission: &Mission) -> DomainResult<()> {
        let options_json = serde_json::to_string(&mission.options)?;

        let result = sqlx::query(
            r#"UPDATE missions SET status = ?, options = ?, current_report_version = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(mission.status.as_str())
        .bind(&options_json)
        .bind(mission.current_report_version.map(i64::from))
        .bind(mission.updated_at.to_rfc3339())
        .bind(mission.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("mission {}", mission.id)));
        }
        Ok(())
    }

    async fn list(&self, filter: MissionFilter) -> DomainResult<Vec<Mission>> {
        let mut query = String::from("SELECT * FROM missions WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(chat_id) = filter.chat_id {
            query.push_str(" AND chat_id = ?");
            bindings.push(chat_id.to_string());
        }
        if let Some(status) = filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, MissionRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<MissionRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Mission::try_from).collect()
    }

    async fn get_context(&self, mission_id: Uuid) -> DomainResult<Option<MissionContext>> {
        let row: Option<MissionContextRow> = sqlx::query_as("SELECT schema_version, context FROM mission_contexts WHERE mission_id = ?")
            .bind(mission_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| -> DomainResult<MissionContext> {
            let context: MissionContext = super::parse_json(&r.context)?;
            Ok(context.sanitize())
        })
        .transpose()
    }

    async fn save_context(&self, mission_id: Uuid, context: &MissionContext) -> DomainResult<()> {
        let context_json = serde_json::to_string(context)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO mission_contexts (mission_id, schema_version, context, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(mission_id) DO UPDATE SET schema_version = excluded.schema_version, context = excluded.context, updated_at = excluded.updated_at"#,
        )
        .bind(mission_id.to_string())
        .bind(i64::from(context.schema_version))
        .bind(&context_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteMissionRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteMissionRepository::new(pool)
    }

    #[tokio::test]
    async fn create_and_get_roundtrips_mission_and_context() {
        let repo = setup().await;
        let mission = Mission::new(Uuid::new_v4(), "investigate X", MissionOptions { use_web: true, ..Default::default() });
        let context = MissionContext::new(50);

        repo.create(&mission, &context).await.unwrap();

        let fetched = repo.get(mission.id).await.unwrap().unwrap();
        assert_eq!(fetched.request_text, "investigate X");
        assert_eq!(fetched.status, MissionStatus::Pending);

        let fetched_context = repo.get_context(mission.id).await.unwrap().unwrap();
        assert_eq!(fetched_context.schema_version, context.schema_version);
    }

    #[tokio::test]
    async fn update_persists_status_transition() {
        let repo = setup().await;
        let mut mission = Mission::new(Uuid::new_v4(), "investigate Y", MissionOptions { use_web: true, ..Default::default() });
        let context = MissionContext::new(50);
        repo.create(&mission, &context).await.unwrap();

        mission.transition(MissionStatus::Planning).unwrap();
        repo.update(&mission).await.unwrap();

        let fetched = repo.get(mission.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, MissionStatus::Planning);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = setup().await;
        let chat_id = Uuid::new_v4();
        let mission = Mission::new(chat_id, "z", MissionOptions { use_web: true, ..Default::default() });
        repo.create(&mission, &MissionContext::new(50)).await.unwrap();

        let found = repo.list(MissionFilter { chat_id: Some(chat_id), status: Some(MissionStatus::Pending) }).await.unwrap();
        assert_eq!(found.len(), 1);

        let empty = repo.list(MissionFilter { chat_id: Some(chat_id), status: Some(MissionStatus::Completed) }).await.unwrap();
        assert!(empty.is_empty());
    }
}
