//! Domain model types: the data shapes the rest of the crate operates on,
//! free of any persistence or transport concerns.

pub mod agent_output;
pub mod chunk;
pub mod config;
pub mod document;
pub mod execution_log;
pub mod mission;
pub mod mission_context;
pub mod note;
pub mod report_version;

pub use agent_output::{AgentOutput, Critique, Gap, NoteBatch, PlanOutput, ProposedNote, QueryDecomposition};
pub use chunk::{Chunk, ChunkMetadata, DenseVector, SparseVector};
pub use config::{AnnParams, ChunkWindow, ConfigValidationError, HybridWeights, ModelTier, RagConfig, ResearchConfig};
pub use document::{Document, DocumentFormat, DocumentMetadata, DocumentStatus};
pub use execution_log::{ExecutionLog, LogStatus, Page, TokenCounts, ToolCallRecord};
pub use mission::{Mission, MissionOptions, MissionStatus};
pub use mission_context::{
    DraftVersionRef, GoalPadEntry, GoalStatus, MissionContext, Outline, QuestionNode, Section, ThoughtPad, ThoughtPadEntry,
    MISSION_CONTEXT_SCHEMA_VERSION,
};
pub use note::{Note, SourceRef, SourceType};
pub use report_version::{demote_current, ReportVersion};
