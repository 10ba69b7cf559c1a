//! Note assignment algorithm (§4.1 "Note assignment algorithm", §8 Note
//! assignment bounds invariant).
//!
//! The reranker contract is open-ended: a capability with stable
//! tie-breaks (§9 Open Questions). This is resolved here with a local,
//! deterministic reranker built on the same
//! `EmbeddingProvider` used for retrieval — cosine similarity between a
//! note's content embedding and the section description's embedding —
//! rather than a second LLM round trip, so assignment is reproducible
//! and testable without a mock substrate.

use std::sync::Arc;

use crate::domain::errors::{DomainResult, RagError};
use crate::domain::models::Note;
use crate::domain::ports::EmbeddingProvider;

#[derive(Debug, Clone, Copy)]
pub struct AssignmentBounds {
    pub min_notes: usize,
    pub max_notes: usize,
    pub max_for_reranking: usize,
}

pub struct NoteAssignment {
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl NoteAssignment {
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider }
    }

    /// Assigns notes to a section given its currently-assigned notes and
    /// the pool of unassigned notes. Returns the final ordered set to
    /// persist as the section's assignment (§4.1 steps 1-4).
    pub async fn assign_for_section(&self, section_description: &str, currently_assigned: Vec<Note>, unassigned: Vec<Note>, bounds: AssignmentBounds) -> DomainResult<Vec<Note>> {
        let mut candidates = currently_assigned;
        candidates.extend(unassigned);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let to_rerank = if candidates.len() > bounds.max_for_reranking {
            self.prefilter(section_description, candidates, bounds.max_for_reranking).await?
        } else {
            candidates
        };

        let ranked = self.rerank(section_description, to_rerank).await?;

        let target = bounds.max_notes.min(ranked.len()).max(bounds.min_notes.min(ranked.len()));
        Ok(ranked.into_iter().take(target).collect())
    }

    /// §4.1 step 2: pre-filter by cosine similarity when the candidate
    /// pool exceeds `max_for_reranking`, keeping the top K.
    async fn prefilter(&self, section_description: &str, candidates: Vec<Note>, keep: usize) -> DomainResult<Vec<Note>> {
        let mut scored = self.score_against(section_description, candidates).await?;
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.note_id.cmp(&b.0.note_id)));
        Ok(scored.into_iter().take(keep).map(|(note, _)| note).collect())
    }

    /// §4.1 step 3: final stable ranking against the section description.
    async fn rerank(&self, section_description: &str, candidates: Vec<Note>) -> DomainResult<Vec<Note>> {
        let mut scored = self.score_against(section_description, candidates).await?;
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.note_id.cmp(&b.0.note_id)));
        Ok(scored.into_iter().map(|(note, _)| note).collect())
    }

    async fn score_against(&self, section_description: &str, candidates: Vec<Note>) -> DomainResult<Vec<(Note, f32)>> {
        let mut texts: Vec<String> = candidates.iter().map(|n| n.content.clone()).collect();
        texts.push(section_description.to_string());
        let mut embeddings = self.embedding_provider.embed_dense(&texts).await.map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;
        let section_embedding = embeddings.pop().expect("one embedding per input text including the section description");

        Ok(candidates.into_iter().zip(embeddings).map(|(note, embedding)| (note, embedding.cosine_similarity(&section_embedding))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::DeterministicEmbeddingProvider;
    use crate::domain::models::SourceRef;
    use uuid::Uuid;

    fn note(mission_id: Uuid, content: &str) -> Note {
        let url = format!("https://example.com/{content}");
        Note::try_new(mission_id, format!("{content} per {url}"), SourceRef::Web { url }, vec![]).unwrap()
    }

    #[tokio::test]
    async fn enforces_max_notes_truncating_the_tail() {
        let assignment = NoteAssignment::new(Arc::new(DeterministicEmbeddingProvider::new(16, 64)));
        let mission_id = Uuid::new_v4();
        let unassigned: Vec<Note> = (0..10).map(|i| note(mission_id, &format!("finding-{i}"))).collect();
        let bounds = AssignmentBounds { min_notes: 1, max_notes: 3, max_for_reranking: 50 };

        let assigned = assignment.assign_for_section("section about findings", Vec::new(), unassigned, bounds).await.unwrap();
        assert_eq!(assigned.len(), 3);
    }

    #[tokio::test]
    async fn keeps_all_notes_when_pool_is_smaller_than_min() {
        let assignment = NoteAssignment::new(Arc::new(DeterministicEmbeddingProvider::new(16, 64)));
        let mission_id = Uuid::new_v4();
        let unassigned: Vec<Note> = (0..2).map(|i| note(mission_id, &format!("finding-{i}"))).collect();
        let bounds = AssignmentBounds { min_notes: 5, max_notes: 15, max_for_reranking: 50 };

        let assigned = assignment.assign_for_section("section about findings", Vec::new(), unassigned, bounds).await.unwrap();
        assert_eq!(assigned.len(), 2);
    }

    #[tokio::test]
    async fn prefilters_large_pools_before_final_ranking() {
        let assignment = NoteAssignment::new(Arc::new(DeterministicEmbeddingProvider::new(16, 64)));
        let mission_id = Uuid::new_v4();
        let unassigned: Vec<Note> = (0..100).map(|i| note(mission_id, &format!("finding-{i}"))).collect();
        let bounds = AssignmentBounds { min_notes: 1, max_notes: 5, max_for_reranking: 10 };

        let assigned = assignment.assign_for_section("section about findings", Vec::new(), unassigned, bounds).await.unwrap();
        assert_eq!(assigned.len(), 5);
    }

    #[tokio::test]
    async fn ranking_is_deterministic_across_calls() {
        let assignment = NoteAssignment::new(Arc::new(DeterministicEmbeddingProvider::new(16, 64)));
        let mission_id = Uuid::new_v4();
        let unassigned: Vec<Note> = (0..8).map(|i| note(mission_id, &format!("finding-{i}"))).collect();
        let bounds = AssignmentBounds { min_notes: 1, max_notes: 4, max_for_reranking: 50 };

        let first = assignment.assign_for_section("section about findings", Vec::new(), unassigned.clone(), bounds).await.unwrap();
        let second = assignment.assign_for_section("section about findings", Vec::new(), unassigned, bounds).await.unwrap();
        assert_eq!(first.iter().map(|n| n.note_id).collect::<Vec<_>>(), second.iter().map(|n| n.note_id).collect::<Vec<_>>());
    }
}
