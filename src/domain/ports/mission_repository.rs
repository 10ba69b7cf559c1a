//! Mission and `MissionContext` persistence port (§3, §4.1).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Mission, MissionContext, MissionStatus};

/// Filter criteria for listing missions.
#[derive(Debug, Clone, Default)]
pub struct MissionFilter {
    pub chat_id: Option<Uuid>,
    pub status: Option<MissionStatus>,
}

/// Repository interface for `Mission` and its `MissionContext`.
///
/// The context is stored as a single JSON blob keyed by mission id rather
/// than as its own table: one row per aggregate root with serialized
/// sub-state (§6).
#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn create(&self, mission: &Mission, context: &MissionContext) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Mission>>;

    async fn update(&self, mission: &Mission) -> DomainResult<()>;

    async fn list(&self, filter: MissionFilter) -> DomainResult<Vec<Mission>>;

    async fn get_context(&self, mission_id: Uuid) -> DomainResult<Option<MissionContext>>;

    async fn save_context(&self, mission_id: Uuid, context: &MissionContext) -> DomainResult<()>;
}
