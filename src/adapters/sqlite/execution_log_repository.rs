//! SQLite implementation of `ExecutionLogRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExecutionLog, LogStatus, Page, TokenCounts, ToolCallRecord};
use crate::domain::ports::ExecutionLogRepository;

#[derive(Clone)]
pub struct SqliteExecutionLogRepository {
    pool: SqlitePool,
}

impl SqliteExecutionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ExecutionLogRow {
    id: String,
    mission_id: String,
    timestamp: String,
    agent_name: String,
    action: String,
    status: String,
    input_summary: String,
    output_summary: String,
    error_message: Option<String>,
    model_details: Option<String>,
    token_counts: String,
    cost_decimal: f64,
    tool_calls: String,
}

impl TryFrom<ExecutionLogRow> for ExecutionLog {
    type Error = DomainError;

    fn try_from(row: ExecutionLogRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "success" => LogStatus::Success,
            "failure" => LogStatus::Failure,
            "warning" => LogStatus::Warning,
            "running" => LogStatus::Running,
            other => return Err(DomainError::Serialization(format!("invalid log status: {other}"))),
        };
        let token_counts: TokenCounts = super::parse_json(&row.token_counts)?;
        let tool_calls: Vec<ToolCallRecord> = super::parse_json(&row.tool_calls)?;
        Ok(ExecutionLog {
            id: super::parse_uuid(&row.id)?,
            mission_id: super::parse_uuid(&row.mission_id)?,
            timestamp: super::parse_datetime(&row.timestamp)?,
            agent_name: row.agent_name,
            action: row.action,
            status,
            input_summary: row.input_summary,
            output_summary: row.output_summary,
            error_message: row.error_message,
            model_details: row.model_details,
            token_counts,
            cost_decimal: row.cost_decimal,
            tool_calls,
        })
    }
}

#[async_trait]
impl ExecutionLogRepository for SqliteExecutionLogRepository {
    async fn append(&self, log: &ExecutionLog) -> DomainResult<()> {
        let token_counts_json = serde_json::to_string(&log.token_counts)?;
        let tool_calls_json = serde_json::to_string(&log.tool_calls)?;

        sqlx::query(
            r#"INSERT INTO execution_logs (id, mission_id, timestamp, agent_name, action, status, input_summary, output_summary, error_message, model_details, token_counts, cost_decimal, tool_calls)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(log.id.to_string())
        .bind(log.mission_id.to_string())
        .bind(log.timestamp.to_rfc3339())
        .bind(&log.agent_name)
        .bind(&log.action)
        .bind(log.status.as_str())
        .bind(&log.input_summary)
        .bind(&log.output_summary)
        .bind(&log.error_message)
        .bind(&log.model_details)
        .bind(&token_counts_json)
        .bind(log.cost_decimal)
        .bind(&tool_calls_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_mission(&self, mission_id: Uuid, page: Page) -> DomainResult<Vec<ExecutionLog>> {
        let rows: Vec<ExecutionLogRow> = sqlx::query_as("SELECT * FROM execution_logs WHERE mission_id = ? ORDER BY timestamp LIMIT ? OFFSET ?")
            .bind(mission_id.to_string())
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ExecutionLog::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteExecutionLogRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteExecutionLogRepository::new(pool)
    }

    #[tokio::test]
    async fn append_and_list_preserve_order() {
        let repo = setup().await;
        let mission_id = Uuid::new_v4();
        repo.append(&ExecutionLog::new(mission_id, "research", "retrieve", LogStatus::Success, "q1", "3 notes")).await.unwrap();
        repo.append(&ExecutionLog::new(mission_id, "research", "retrieve", LogStatus::Success, "q2", "1 note")).await.unwrap();

        let page = repo.list_by_mission(mission_id, Page::new(0, 10)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].input_summary, "q1");
    }

    #[tokio::test]
    async fn pagination_respects_limit() {
        let repo = setup().await;
        let mission_id = Uuid::new_v4();
        for i in 0..5 {
            repo.append(&ExecutionLog::new(mission_id, "research", "retrieve", LogStatus::Success, format!("q{i}"), "ok")).await.unwrap();
        }

        let page = repo.list_by_mission(mission_id, Page::new(0, 2)).await.unwrap();
        assert_eq!(page.len(), 2);
    }
}
