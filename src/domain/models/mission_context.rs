//! `MissionContext`: the persisted, monotonically-evolving state of a
//! mission (§3). Stored as a single JSON blob alongside the `Mission` row;
//! `Note`/`ExecutionLog`/`ReportVersion` rows are referenced by id only —
//! per §9, "no back-pointers stored".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version. Older records are sanitized on load (§6).
pub const MISSION_CONTEXT_SCHEMA_VERSION: u32 = 1;

/// One node of the hierarchical research outline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub research_strategy: String,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(title: impl Into<String>, description: impl Into<String>, research_strategy: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            research_strategy: research_strategy.into(),
            subsections: Vec::new(),
        }
    }

    /// Maximum depth of this subtree (a leaf section has depth 1).
    pub fn depth(&self) -> usize {
        1 + self.subsections.iter().map(Section::depth).max().unwrap_or(0)
    }

    /// Depth-first pre-order traversal, used by Phase 3 (§4.1).
    pub fn preorder(&self) -> Vec<&Section> {
        let mut out = vec![self];
        for child in &self.subsections {
            out.extend(child.preorder());
        }
        out
    }

    pub fn find(&self, id: Uuid) -> Option<&Section> {
        if self.id == id {
            return Some(self);
        }
        self.subsections.iter().find_map(|s| s.find(id))
    }
}

/// The hierarchical outline produced/revised by the Planning Agent (§4.1
/// Phase 1) and carried through structured research and writing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outline {
    pub sections: Vec<Section>,
    pub revision_notes: Option<String>,
}

impl Outline {
    pub fn max_depth(&self) -> usize {
        self.sections.iter().map(Section::depth).max().unwrap_or(0)
    }

    pub fn preorder(&self) -> Vec<&Section> {
        self.sections.iter().flat_map(Section::preorder).collect()
    }

    pub fn find(&self, id: Uuid) -> Option<&Section> {
        self.sections.iter().find_map(|s| s.find(id))
    }

    /// §4.1 Phase 1 tie-break: accept a proposed revision only when it
    /// carries non-empty revision notes AND changes at least one child
    /// section relative to `self`; otherwise the prior outline wins.
    pub fn reconcile_revision(self, proposed: Outline) -> Outline {
        let notes_present = proposed.revision_notes.as_deref().is_some_and(|n| !n.trim().is_empty());
        let changed = proposed.sections != self.sections;
        if notes_present && changed {
            proposed
        } else {
            self
        }
    }
}

/// A node in the initial breadth-first exploration tree (§3, GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionNode {
    pub id: Uuid,
    pub question: String,
    #[serde(default)]
    pub children: Vec<QuestionNode>,
}

impl QuestionNode {
    pub fn new(question: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), question: question.into(), children: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(QuestionNode::depth).max().unwrap_or(0)
    }

    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(QuestionNode::count_nodes).sum::<usize>()
    }

    /// Leaves in breadth-first order (Phase 2 iterates these, §4.1).
    pub fn leaves_bfs(roots: &[QuestionNode]) -> Vec<&QuestionNode> {
        let mut queue: std::collections::VecDeque<&QuestionNode> = roots.iter().collect();
        let mut leaves = Vec::new();
        while let Some(node) = queue.pop_front() {
            if node.children.is_empty() {
                leaves.push(node);
            } else {
                queue.extend(node.children.iter());
            }
        }
        leaves
    }
}

/// Status of a goal-pad entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Addressed,
    Obsolete,
}

/// A user-stated constraint or agent-derived sub-goal (§3 `goal_pad`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalPadEntry {
    pub goal_id: Uuid,
    pub text: String,
    pub status: GoalStatus,
    pub source_agent: String,
}

/// One entry of the bounded FIFO `thought_pad` (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThoughtPadEntry {
    pub thought_id: Uuid,
    pub agent_name: String,
    pub content: String,
}

/// Bounded FIFO memory: oldest entries are dropped once `limit` is exceeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThoughtPad {
    entries: std::collections::VecDeque<ThoughtPadEntry>,
    limit: usize,
}

impl ThoughtPad {
    pub fn new(limit: usize) -> Self {
        Self { entries: std::collections::VecDeque::new(), limit: limit.max(1) }
    }

    pub fn push(&mut self, agent_name: impl Into<String>, content: impl Into<String>) {
        self.entries.push_back(ThoughtPadEntry { thought_id: Uuid::new_v4(), agent_name: agent_name.into(), content: content.into() });
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ThoughtPadEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// §7 `ContextOverflow` recovery step: drop the oldest `count` entries.
    pub fn drop_oldest(&mut self, count: usize) {
        for _ in 0..count.min(self.entries.len()) {
            self.entries.pop_front();
        }
    }
}

/// A snapshot of the generated report kept for the mission's revision
/// history, distinct from the persisted `ReportVersion` rows (§3) — this
/// one just tracks the revision note attached to the snapshot inside the
/// evolving context, per §3's `draft_versions` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftVersionRef {
    pub version: u32,
    pub revision_notes: Option<String>,
}

/// The evolving, persisted state of a single mission (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionContext {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub plan: Outline,
    #[serde(default)]
    pub question_tree: Vec<QuestionNode>,
    #[serde(default)]
    pub goal_pad: Vec<GoalPadEntry>,
    #[serde(default)]
    pub thought_pad: ThoughtPad,
    #[serde(default)]
    pub agent_scratchpad: String,
    /// References into the Note Store (§4.5); Notes themselves are rows,
    /// not embedded here (§6, §9).
    #[serde(default)]
    pub note_ids: Vec<Uuid>,
    #[serde(default)]
    pub section_assignments: std::collections::HashMap<Uuid, Vec<Uuid>>,
    #[serde(default)]
    pub draft_versions: Vec<DraftVersionRef>,
    pub updated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    MISSION_CONTEXT_SCHEMA_VERSION
}

impl Default for MissionContext {
    fn default() -> Self {
        Self::new(50)
    }
}

impl MissionContext {
    pub fn new(thought_pad_limit: usize) -> Self {
        Self {
            schema_version: MISSION_CONTEXT_SCHEMA_VERSION,
            plan: Outline::default(),
            question_tree: Vec::new(),
            goal_pad: Vec::new(),
            thought_pad: ThoughtPad::new(thought_pad_limit),
            agent_scratchpad: String::new(),
            note_ids: Vec::new(),
            section_assignments: std::collections::HashMap::new(),
            draft_versions: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Sanitizes a context loaded from storage: drops unknown-version
    /// fields silently (serde already does this), and fills in anything
    /// added since the stored schema version (§6).
    pub fn sanitize(mut self) -> Self {
        if self.schema_version < MISSION_CONTEXT_SCHEMA_VERSION {
            self.schema_version = MISSION_CONTEXT_SCHEMA_VERSION;
        }
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn assign_note(&mut self, section_id: Uuid, note_id: Uuid) {
        let entry = self.section_assignments.entry(section_id).or_default();
        if !entry.contains(&note_id) {
            entry.push(note_id);
        }
        self.touch();
    }

    pub fn unassign_all_for_section(&mut self, section_id: Uuid) {
        self.section_assignments.remove(&section_id);
        self.touch();
    }

    pub fn assigned_notes(&self, section_id: Uuid) -> &[Uuid] {
        self.section_assignments.get(&section_id).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_depth_counts_leaf_as_one() {
        let s = Section::new("t", "d", "r");
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn section_preorder_visits_parent_before_children() {
        let mut root = Section::new("root", "d", "r");
        root.subsections.push(Section::new("child", "d", "r"));
        let order = root.preorder();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].title, "root");
        assert_eq!(order[1].title, "child");
    }

    #[test]
    fn reconcile_revision_rejects_empty_notes() {
        let original = Outline { sections: vec![Section::new("A", "d", "r")], revision_notes: None };
        let proposed = Outline { sections: vec![Section::new("B", "d", "r")], revision_notes: None };
        let result = original.clone().reconcile_revision(proposed);
        assert_eq!(result, original);
    }

    #[test]
    fn reconcile_revision_rejects_unchanged_sections_even_with_notes() {
        let original = Outline { sections: vec![Section::new("A", "d", "r")], revision_notes: None };
        let proposed = Outline { sections: original.sections.clone(), revision_notes: Some("revised".into()) };
        let result = original.clone().reconcile_revision(proposed);
        assert_eq!(result, original);
    }

    #[test]
    fn reconcile_revision_accepts_changed_sections_with_notes() {
        let original = Outline { sections: vec![Section::new("A", "d", "r")], revision_notes: None };
        let proposed = Outline { sections: vec![Section::new("B", "d", "r")], revision_notes: Some("revised".into()) };
        let result = original.reconcile_revision(proposed.clone());
        assert_eq!(result, proposed);
    }

    #[test]
    fn question_tree_leaves_bfs_order() {
        let mut a = QuestionNode::new("a");
        a.children.push(QuestionNode::new("a1"));
        a.children.push(QuestionNode::new("a2"));
        let b = QuestionNode::new("b");
        let leaves = QuestionNode::leaves_bfs(&[a, b]);
        assert_eq!(leaves.iter().map(|n| n.question.as_str()).collect::<Vec<_>>(), vec!["a1", "a2", "b"]);
    }

    #[test]
    fn thought_pad_drops_oldest_beyond_limit() {
        let mut pad = ThoughtPad::new(2);
        pad.push("agent", "first");
        pad.push("agent", "second");
        pad.push("agent", "third");
        let contents: Vec<_> = pad.entries().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "third"]);
    }

    #[test]
    fn section_assignment_is_idempotent() {
        let mut ctx = MissionContext::new(10);
        let section = Uuid::new_v4();
        let note = Uuid::new_v4();
        ctx.assign_note(section, note);
        ctx.assign_note(section, note);
        assert_eq!(ctx.assigned_notes(section).len(), 1);
    }
}
