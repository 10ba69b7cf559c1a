//! Mission domain model and state machine (§3, §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a `Mission` (§4.1 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Planning,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl MissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planning => "planning",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "planning" => Some(Self::Planning),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "stopped" => Some(Self::Stopped),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Valid next states from this state (§4.1 transition diagram). `Stopped`
    /// and `Completed` both reopen into `Running`/`Planning` respectively,
    /// which is why they are not folded into a single terminal bucket.
    pub fn valid_transitions(self) -> &'static [MissionStatus] {
        match self {
            Self::Pending => &[Self::Planning],
            Self::Planning => &[Self::Running, Self::Stopped, Self::Failed],
            Self::Running => &[Self::Running, Self::Stopped, Self::Failed, Self::Completed],
            Self::Paused => &[Self::Running, Self::Stopped],
            Self::Stopped => &[Self::Running],
            Self::Completed => &[Self::Planning],
            Self::Failed => &[],
        }
    }

    pub fn can_transition_to(self, next: MissionStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Options supplied at mission creation (§4.1 `create_mission`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionOptions {
    pub use_web: bool,
    pub doc_group_id: Option<Uuid>,
    pub auto_save_sources: bool,
    /// Per-mission overrides layered on top of the global `ResearchConfig`.
    #[serde(default)]
    pub param_overrides: serde_json::Map<String, serde_json::Value>,
}

impl MissionOptions {
    /// §4.1 precondition: at least one of web-search or a document group
    /// must be enabled, or the mission has no sources to draw on.
    pub fn has_sources(&self) -> bool {
        self.use_web || self.doc_group_id.is_some()
    }
}

/// A research run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub request_text: String,
    pub status: MissionStatus,
    pub options: MissionOptions,
    pub current_report_version: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    pub fn new(chat_id: Uuid, request_text: impl Into<String>, options: MissionOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            chat_id,
            request_text: request_text.into(),
            status: MissionStatus::Pending,
            options,
            current_report_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attempts the transition, enforcing the state machine (§4.1). Returns
    /// the previous status on success so callers can log both sides.
    pub fn transition(&mut self, next: MissionStatus) -> Result<MissionStatus, (MissionStatus, MissionStatus)> {
        if self.status == next || self.status.can_transition_to(next) {
            let prev = self.status;
            self.status = next;
            self.updated_at = Utc::now();
            Ok(prev)
        } else {
            Err((self.status, next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_running_requires_planning_first() {
        assert!(!MissionStatus::Pending.can_transition_to(MissionStatus::Running));
        assert!(MissionStatus::Pending.can_transition_to(MissionStatus::Planning));
    }

    #[test]
    fn running_self_transition_is_idempotent_via_mission() {
        let mut mission = Mission::new(Uuid::new_v4(), "test", MissionOptions { use_web: true, ..Default::default() });
        mission.transition(MissionStatus::Planning).unwrap();
        mission.transition(MissionStatus::Running).unwrap();
        assert!(mission.transition(MissionStatus::Running).is_ok());
    }

    #[test]
    fn failed_is_terminal_with_no_transitions() {
        assert!(MissionStatus::Failed.is_terminal());
        assert!(MissionStatus::Failed.valid_transitions().is_empty());
    }

    #[test]
    fn completed_can_reopen_into_planning_for_revision() {
        assert!(MissionStatus::Completed.can_transition_to(MissionStatus::Planning));
    }

    #[test]
    fn invalid_transition_returns_both_states() {
        let mut mission = Mission::new(Uuid::new_v4(), "test", MissionOptions::default());
        let err = mission.transition(MissionStatus::Completed).unwrap_err();
        assert_eq!(err, (MissionStatus::Pending, MissionStatus::Completed));
    }

    #[test]
    fn mission_options_requires_a_source() {
        assert!(!MissionOptions::default().has_sources());
        assert!(MissionOptions { use_web: true, ..Default::default() }.has_sources());
        assert!(MissionOptions { doc_group_id: Some(Uuid::new_v4()), ..Default::default() }.has_sources());
    }
}
