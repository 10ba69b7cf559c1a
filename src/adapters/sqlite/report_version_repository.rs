//! SQLite implementation of `ReportVersionRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ReportVersion;
use crate::domain::ports::ReportVersionRepository;

#[derive(Clone)]
pub struct SqliteReportVersionRepository {
    pool: SqlitePool,
}

impl SqliteReportVersionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReportVersionRow {
    version: i64,
    title: Option<String>,
    content_markdown: String,
    is_current: i64,
    revision_notes: Option<String>,
    created_at: String,
}

impl TryFrom<ReportVersionRow> for ReportVersion {
    type Error = DomainError;

    fn try_from(row: ReportVersionRow) -> Result<Self, Self::Error> {
        Ok(ReportVersion {
            version: row.version as u32,
            title: row.title,
            content_markdown: row.content_markdown,
            is_current: row.is_current != 0,
            revision_notes: row.revision_notes,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[async_trait]
impl ReportVersionRepository for SqliteReportVersionRepository {
    async fn append(&self, mission_id: Uuid, version: &ReportVersion) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE report_versions SET is_current = 0 WHERE mission_id = ?").bind(mission_id.to_string()).execute(&mut *tx).await?;

        sqlx::query(
            r#"INSERT INTO report_versions (mission_id, version, title, content_markdown, is_current, revision_notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(mission_id.to_string())
        .bind(i64::from(version.version))
        .bind(&version.title)
        .bind(&version.content_markdown)
        .bind(i64::from(version.is_current))
        .bind(&version.revision_notes)
        .bind(version.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, mission_id: Uuid) -> DomainResult<Vec<ReportVersion>> {
        let rows: Vec<ReportVersionRow> =
            sqlx::query_as("SELECT * FROM report_versions WHERE mission_id = ? ORDER BY version").bind(mission_id.to_string()).fetch_all(&self.pool).await?;
        rows.into_iter().map(ReportVersion::try_from).collect()
    }

    async fn get_current(&self, mission_id: Uuid) -> DomainResult<Option<ReportVersion>> {
        let row: Option<ReportVersionRow> = sqlx::query_as("SELECT * FROM report_versions WHERE mission_id = ? AND is_current = 1")
            .bind(mission_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReportVersion::try_from).transpose()
    }
}
