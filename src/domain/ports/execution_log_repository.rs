//! Execution log persistence port (§3).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ExecutionLog, Page};

#[async_trait]
pub trait ExecutionLogRepository: Send + Sync {
    /// Append-only: logs are never mutated after creation.
    async fn append(&self, log: &ExecutionLog) -> DomainResult<()>;

    async fn list_by_mission(&self, mission_id: Uuid, page: Page) -> DomainResult<Vec<ExecutionLog>>;
}
