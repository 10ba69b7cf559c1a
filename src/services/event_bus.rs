//! Mission event bus (§9 supplemented feature B.3): a `SequenceNumber`/
//! `EventId`/broadcast pattern carrying MAESTRO's own event taxonomy
//! (§6 Mission API).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{MissionStatus, Note, ReportVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic per-mission sequence number, assigned by `EventBus::publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

/// The phase names used in `phase_transition` events (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Planning,
    InitialExploration,
    StructuredResearch,
    Writing,
}

/// Tagged payload for one mission event (§6 Mission API event list).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    MissionStatus { status: MissionStatus },
    PlanUpdate { revision_notes: Option<String> },
    NoteAdded { note: Box<Note> },
    LogEntry { agent_name: String, action: String, status: String },
    DraftUpdate { version: Box<ReportVersion> },
    StatsUpdate { total_tokens: u64, total_cost_usd: f64 },
    PhaseTransition { phase: MissionPhase },
}

impl EventPayload {
    /// `mission_status` and `phase_transition` are hard-guaranteed
    /// delivery (§9); everything else is best-effort, drop-oldest.
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::MissionStatus { .. } | Self::PhaseTransition { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub id: EventId,
    pub sequence: SequenceNumber,
    pub mission_id: Uuid,
    pub at: DateTime<Utc>,
    pub payload: EventPayload,
}

/// Per-mission event bus: a causally-ordered fan-out of `MissionEvent`s to
/// any number of subscribers. Critical events use a large-capacity
/// broadcast channel so they are not dropped under expected subscriber
/// counts; non-critical events use a small bounded channel where tokio's
/// broadcast ring buffer naturally evicts the oldest entry under
/// back-pressure (§9 "bounded buffer, drop-oldest").
pub struct EventBus {
    mission_id: Uuid,
    next_sequence: AtomicU64,
    critical_tx: broadcast::Sender<MissionEvent>,
    best_effort_tx: broadcast::Sender<MissionEvent>,
}

/// A subscription handle exposing both event streams.
pub struct EventSubscription {
    pub critical: broadcast::Receiver<MissionEvent>,
    pub best_effort: broadcast::Receiver<MissionEvent>,
}

impl EventBus {
    pub fn new(mission_id: Uuid) -> Arc<Self> {
        let (critical_tx, _) = broadcast::channel(1024);
        let (best_effort_tx, _) = broadcast::channel(64);
        Arc::new(Self { mission_id, next_sequence: AtomicU64::new(0), critical_tx, best_effort_tx })
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription { critical: self.critical_tx.subscribe(), best_effort: self.best_effort_tx.subscribe() }
    }

    /// Publishes `payload`, assigning it the next sequence number and
    /// routing it to the appropriate channel. Returns without error even
    /// if there are no subscribers (broadcast sends are best-effort when
    /// the receiver count is zero).
    pub fn publish(&self, payload: EventPayload) -> MissionEvent {
        let sequence = SequenceNumber(self.next_sequence.fetch_add(1, Ordering::SeqCst));
        let event = MissionEvent { id: EventId::new(), sequence, mission_id: self.mission_id, at: Utc::now(), payload };

        let tx = if event.payload.is_critical() { &self.critical_tx } else { &self.best_effort_tx };
        let _ = tx.send(event.clone());
        event
    }
}
