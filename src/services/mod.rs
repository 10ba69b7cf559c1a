//! Domain services: the orchestration layer sitting on top of the ports.
//! Free of storage/transport specifics, composed from adapters by the
//! binary entry point.

mod agent_support;
pub mod circuit_breaker;
pub mod concurrency_governor;
pub mod cost_meter;
pub mod event_bus;
pub mod hybrid_retriever;
pub mod ingestion_pipeline;
pub mod mission_controller;
pub mod note_assignment;
pub mod note_store;
pub mod planning_agent;
pub mod reflection_agent;
pub mod research_agent;
pub mod retry;
pub mod web_collector;
pub mod writing_agent;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitScope};
pub use concurrency_governor::ConcurrencyGovernor;
pub use cost_meter::{CostMeter, MissionCostStats, TierPricing};
pub use event_bus::{EventBus, EventPayload, MissionEvent, MissionPhase};
pub use hybrid_retriever::{HybridRetriever, RetrievalQuery, RetrievedChunk};
pub use ingestion_pipeline::{IngestRequest, IngestionPipeline};
pub use mission_controller::MissionController;
pub use note_assignment::{AssignmentBounds, NoteAssignment};
pub use note_store::{AddOutcome, NoteStore};
pub use planning_agent::{PlanningAgent, PlanningInput, PlanningResult};
pub use reflection_agent::{ReflectionAgent, ReflectionInput, ReflectionResult};
pub use research_agent::{AgentCallMeta, ResearchAgent};
pub use retry::RetryPolicy;
pub use web_collector::{WebCollector, WebFinding};
pub use writing_agent::{PreviousPass, WritingAgent, WritingInput, WritingResult};
