//! Report version persistence port (§3, §8).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::ReportVersion;

#[async_trait]
pub trait ReportVersionRepository: Send + Sync {
    /// Appends `version` and demotes any prior current version, atomically
    /// maintaining the "exactly one current" invariant (§8).
    async fn append(&self, mission_id: Uuid, version: &ReportVersion) -> DomainResult<()>;

    async fn list(&self, mission_id: Uuid) -> DomainResult<Vec<ReportVersion>>;

    async fn get_current(&self, mission_id: Uuid) -> DomainResult<Option<ReportVersion>>;
}
