//! Typed variants for the dynamic structured outputs the LLM capability is
//! asked to emit for planning, research, and reflection (§9 "Dynamic
//! structured outputs → typed variants").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mission_context::{Outline, QuestionNode};
use super::note::SourceRef;

/// Output of a Planning Agent pass (§4.1 Phase 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanOutput {
    pub outline: Outline,
    pub question_tree: Vec<QuestionNode>,
}

/// A single note as proposed by the Research Agent, prior to being
/// admitted into the Note Store (so it can still be rejected by the
/// citation invariant in `Note::try_new`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedNote {
    pub content: String,
    pub source_ref: SourceRef,
    pub tags: Vec<String>,
}

/// Output of a Research Agent pass (§4.1 Phases 2-3): a batch of notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NoteBatch {
    pub notes: Vec<ProposedNote>,
}

/// A single identified coverage gap (§4.1 Phase 3 Reflection).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gap {
    pub section_id: Option<Uuid>,
    pub description: String,
}

/// Output of a Reflection Agent pass: gap analysis and optional replanning
/// signal (§4.1 Phase 3, Phase 4).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Critique {
    pub gaps: Vec<Gap>,
    pub new_goals: Vec<String>,
    pub new_thoughts: Vec<String>,
    pub sections_needing_revision: Vec<Uuid>,
    pub trigger_replan: bool,
}

impl Critique {
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }
}

/// A bounded set of decomposed search queries emitted by the Research
/// Agent for one research cycle (§4.1 Phase 3, capped by
/// `max_decomposed_queries`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryDecomposition {
    pub queries: Vec<String>,
}

/// The tagged union of everything an agent call can return. Any output
/// that fails to parse into one of these variants is a
/// `ProviderContractError` (§7), handled by one reformat retry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOutput {
    Plan(PlanOutput),
    Notes(NoteBatch),
    Critique(Critique),
    QueryDecomposition(QueryDecomposition),
    /// Writing Agent output: drafted/revised markdown for one section.
    Draft { section_id: Uuid, content_markdown: String },
}
