//! Mission Controller (§4.1): owns the mission lifecycle, coordinates the
//! four agents across the four research phases, enforces bounded
//! iteration and cost, persists state after every atomic update, and
//! emits live events.
//!
//! Split across submodules the way a large orchestrator splits across
//! lifecycle/processing files: this file owns construction and the
//! public lifecycle operations; `phases.rs` owns the four phase
//! algorithms as a second `impl MissionController` block.

mod phases;

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, MissionError};
use crate::domain::models::{
    ExecutionLog, LogStatus, Mission, MissionContext, MissionOptions, MissionStatus, Note, Page, ReportVersion, ResearchConfig, TokenCounts,
};
use crate::domain::ports::{ExecutionLogRepository, Fetcher, MissionRepository, NoteRepository, ReportVersionRepository, Searcher};

use super::circuit_breaker::CircuitBreakerRegistry;
use super::concurrency_governor::ConcurrencyGovernor;
use super::cost_meter::{CostMeter, MissionCostStats};
use super::event_bus::{EventBus, EventPayload, MissionPhase};
use super::hybrid_retriever::HybridRetriever;
use super::note_assignment::NoteAssignment;
use super::note_store::NoteStore;
use super::planning_agent::PlanningAgent;
use super::reflection_agent::ReflectionAgent;
use super::research_agent::ResearchAgent;
use super::retry::RetryPolicy;
use super::web_collector::WebCollector;
use super::writing_agent::WritingAgent;

/// Everything the controller needs to drive a mission, wired once at
/// startup via one large explicit constructor.
pub struct MissionController {
    mission_repository: Arc<dyn MissionRepository>,
    log_repository: Arc<dyn ExecutionLogRepository>,
    report_repository: Arc<dyn ReportVersionRepository>,
    note_store: Arc<NoteStore>,
    retriever: Arc<HybridRetriever>,
    web: Arc<WebCollector>,
    note_assignment: Arc<NoteAssignment>,
    planning_agent: Arc<PlanningAgent>,
    research_agent: Arc<ResearchAgent>,
    reflection_agent: Arc<ReflectionAgent>,
    writing_agent: Arc<WritingAgent>,
    governor: Arc<ConcurrencyGovernor>,
    cost_meter: Arc<CostMeter>,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    retry_policy: RetryPolicy,
    config: ResearchConfig,
    runtime: tokio::sync::RwLock<HashMap<Uuid, MissionRuntime>>,
}

/// Per-mission runtime handles that don't belong in the persisted
/// `MissionContext`: the cancellation token and the event bus.
#[derive(Clone)]
pub(super) struct MissionRuntime {
    pub cancel: CancellationToken,
    pub events: Arc<EventBus>,
}

#[allow(clippy::too_many_arguments)]
impl MissionController {
    pub fn new(
        mission_repository: Arc<dyn MissionRepository>,
        log_repository: Arc<dyn ExecutionLogRepository>,
        report_repository: Arc<dyn ReportVersionRepository>,
        note_store: Arc<NoteStore>,
        retriever: Arc<HybridRetriever>,
        web: Arc<WebCollector>,
        note_assignment: Arc<NoteAssignment>,
        planning_agent: Arc<PlanningAgent>,
        research_agent: Arc<ResearchAgent>,
        reflection_agent: Arc<ReflectionAgent>,
        writing_agent: Arc<WritingAgent>,
        governor: Arc<ConcurrencyGovernor>,
        cost_meter: Arc<CostMeter>,
        circuit_breakers: Arc<CircuitBreakerRegistry>,
        retry_policy: RetryPolicy,
        config: ResearchConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            mission_repository,
            log_repository,
            report_repository,
            note_store,
            retriever,
            web,
            note_assignment,
            planning_agent,
            research_agent,
            reflection_agent,
            writing_agent,
            governor,
            cost_meter,
            circuit_breakers,
            retry_policy,
            config,
            runtime: tokio::sync::RwLock::new(HashMap::new()),
        })
    }

    /// §4.1 `create_mission`.
    pub async fn create_mission(&self, chat_id: Uuid, request_text: impl Into<String>, options: MissionOptions) -> DomainResult<Uuid> {
        if !options.has_sources() {
            return Err(MissionError::NoSourcesConfigured.into());
        }
        let mission = Mission::new(chat_id, request_text, options);
        let context = MissionContext::new(self.config.thought_pad_context_limit);
        self.mission_repository.create(&mission, &context).await?;
        Ok(mission.id)
    }

    /// §4.1 `start`: idempotent if already running; spawns the phase loop
    /// as a background task so the caller is not blocked on the mission.
    pub async fn start(self: &Arc<Self>, mission_id: Uuid) -> DomainResult<()> {
        let mut mission = self.require_mission(mission_id).await?;
        if mission.status == MissionStatus::Running {
            return Ok(());
        }
        if mission.status != MissionStatus::Planning {
            mission.transition(MissionStatus::Planning).map_err(|(from, to)| MissionError::InvalidTransition { from: from.as_str().into(), to: to.as_str().into() })?;
            self.mission_repository.update(&mission).await?;
        }

        let runtime = self.runtime_for(mission_id).await;
        runtime.events.publish(EventPayload::MissionStatus { status: MissionStatus::Planning });

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_mission(mission_id).await });
        Ok(())
    }

    /// §4.1 `stop`: cooperative cancellation via the mission's token.
    pub async fn stop(&self, mission_id: Uuid) -> DomainResult<()> {
        let runtime = self.runtime_for(mission_id).await;
        runtime.cancel.cancel();
        Ok(())
    }

    /// §4.1 `resume`: re-enters `running` from a `stopped` mission,
    /// resuming from the persisted `MissionContext` (a fresh cancellation
    /// token and event bus are issued).
    pub async fn resume(self: &Arc<Self>, mission_id: Uuid) -> DomainResult<()> {
        let mut mission = self.require_mission(mission_id).await?;
        mission
            .transition(MissionStatus::Running)
            .map_err(|(from, to)| MissionError::InvalidTransition { from: from.as_str().into(), to: to.as_str().into() })?;
        self.mission_repository.update(&mission).await?;

        {
            let mut runtimes = self.runtime.write().await;
            runtimes.remove(&mission_id);
        }
        let runtime = self.runtime_for(mission_id).await;
        runtime.events.publish(EventPayload::MissionStatus { status: MissionStatus::Running });

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_mission(mission_id).await });
        Ok(())
    }

    pub async fn get_status(&self, mission_id: Uuid) -> DomainResult<MissionStatus> {
        Ok(self.require_mission(mission_id).await?.status)
    }

    pub async fn get_plan(&self, mission_id: Uuid) -> DomainResult<crate::domain::models::Outline> {
        Ok(self.require_context(mission_id).await?.plan)
    }

    pub async fn get_notes(&self, mission_id: Uuid, page: Page) -> DomainResult<Vec<Note>> {
        self.note_store.list(mission_id, page).await
    }

    pub async fn get_logs(&self, mission_id: Uuid, page: Page) -> DomainResult<Vec<ExecutionLog>> {
        self.log_repository.list_by_mission(mission_id, page).await
    }

    pub async fn get_draft(&self, mission_id: Uuid) -> DomainResult<Option<ReportVersion>> {
        self.report_repository.get_current(mission_id).await
    }

    pub async fn get_stats(&self, mission_id: Uuid) -> MissionCostStats {
        self.cost_meter.get_stats(mission_id).await
    }

    // -- shared internals, used by `phases.rs` too --

    async fn require_mission(&self, mission_id: Uuid) -> DomainResult<Mission> {
        self.mission_repository.get(mission_id).await?.ok_or(DomainError::Mission(MissionError::NotFound(mission_id)))
    }

    async fn require_context(&self, mission_id: Uuid) -> DomainResult<MissionContext> {
        self.mission_repository
            .get_context(mission_id)
            .await?
            .map(MissionContext::sanitize)
            .ok_or(DomainError::Mission(MissionError::CorruptContext(mission_id.to_string())))
    }

    /// Returns the mission's runtime handles, creating them on first use
    /// (a fresh mission start or a resume).
    pub(super) async fn runtime_for(&self, mission_id: Uuid) -> MissionRuntime {
        {
            let runtimes = self.runtime.read().await;
            if let Some(r) = runtimes.get(&mission_id) {
                return r.clone();
            }
        }
        let mut runtimes = self.runtime.write().await;
        runtimes.entry(mission_id).or_insert_with(|| MissionRuntime { cancel: CancellationToken::new(), events: EventBus::new(mission_id) }).clone()
    }

    async fn persist_context(&self, mission_id: Uuid, context: &MissionContext) -> DomainResult<()> {
        self.mission_repository.save_context(mission_id, context).await
    }

    async fn transition_mission(&self, mission_id: Uuid, next: MissionStatus) -> DomainResult<Mission> {
        let mut mission = self.require_mission(mission_id).await?;
        mission
            .transition(next)
            .map_err(|(from, to)| MissionError::InvalidTransition { from: from.as_str().into(), to: to.as_str().into() })?;
        self.mission_repository.update(&mission).await?;
        Ok(mission)
    }

    async fn log(&self, mission_id: Uuid, agent_name: &str, action: &str, status: LogStatus, input_summary: impl Into<String>, output_summary: impl Into<String>) {
        let log = ExecutionLog::new(mission_id, agent_name, action, status, input_summary, output_summary);
        if let Err(err) = self.log_repository.append(&log).await {
            tracing::warn!(%mission_id, %err, "failed to append execution log");
        }
    }

    /// Like `log`, but for a completed LLM call: also records token/cost
    /// and model details on the log entry.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn log_call(
        &self,
        mission_id: Uuid,
        agent_name: &str,
        action: &str,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
        model_details: impl Into<String>,
        tokens: TokenCounts,
        cost: f64,
    ) {
        let log = ExecutionLog::new(mission_id, agent_name, action, LogStatus::Success, input_summary, output_summary)
            .with_tokens(tokens, cost)
            .with_model_details(model_details);
        if let Err(err) = self.log_repository.append(&log).await {
            tracing::warn!(%mission_id, %err, "failed to append execution log");
        }
    }
}
