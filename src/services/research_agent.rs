//! Research Agent (§4.1 Phases 2-3): decomposes a question/section into
//! bounded search queries and turns retrieved material into proposed
//! notes. Notes returned here are not yet admitted to the store — the
//! caller routes them through `NoteStore::add` so the citation invariant
//! in `Note::try_new` still applies.

use std::sync::Arc;

use crate::domain::errors::SubstrateError;
use crate::domain::models::{AgentOutput, ModelTier, NoteBatch, ProposedNote, QueryDecomposition, TokenCounts};
use crate::domain::ports::LlmSubstrate;

use super::agent_support::{call_structured, system_message, user_message};

const DECOMPOSE_SYSTEM_PROMPT: &str = "You decompose a research question or section into a small set of concrete search queries that, together, would surface the evidence needed to answer it.";
const NOTES_SYSTEM_PROMPT: &str = "You extract discrete, well-cited findings from the supplied source material. Every note must cite a specific source passage. Do not invent facts not present in the material.";

pub struct AgentCallMeta {
    pub tokens: TokenCounts,
    pub model_details: String,
}

pub struct ResearchAgent {
    substrate: Arc<dyn LlmSubstrate>,
    tier: ModelTier,
}

impl ResearchAgent {
    pub fn new(substrate: Arc<dyn LlmSubstrate>, tier: ModelTier) -> Self {
        Self { substrate, tier }
    }

    pub fn tier(&self) -> ModelTier {
        self.tier
    }

    /// §4.1 Phase 3: decomposes `topic` into at most `max_queries` search
    /// queries.
    pub async fn decompose_queries(&self, topic: &str, max_queries: usize) -> Result<(QueryDecomposition, AgentCallMeta), SubstrateError> {
        let prompt = format!("Topic: {topic}\n\nProduce at most {max_queries} search queries.");
        let messages = vec![system_message(DECOMPOSE_SYSTEM_PROMPT), user_message(prompt)];
        let result = call_structured(self.substrate.as_ref(), self.tier, messages, "query_decomposition", None).await?;
        match result.output {
            AgentOutput::QueryDecomposition(mut decomposition) => {
                decomposition.queries.truncate(max_queries);
                Ok((decomposition, AgentCallMeta { tokens: result.tokens, model_details: result.model_details }))
            }
            other => Err(SubstrateError::ProviderContract(format!("expected a query_decomposition variant, got {other:?}"))),
        }
    }

    /// §4.1 Phases 2-3: turns `source_material` into a batch of proposed
    /// notes, each under `content_limit` characters.
    pub async fn propose_notes(&self, question: &str, source_material: &str, content_limit: usize) -> Result<(NoteBatch, AgentCallMeta), SubstrateError> {
        let prompt = format!("Question: {question}\n\nSource material:\n{source_material}\n\nEach note's content must be under {content_limit} characters and must cite a passage from the material above.");
        let messages = vec![system_message(NOTES_SYSTEM_PROMPT), user_message(prompt)];
        let result = call_structured(self.substrate.as_ref(), self.tier, messages, "notes", None).await?;
        match result.output {
            AgentOutput::Notes(batch) => {
                let notes: Vec<ProposedNote> = batch.notes.into_iter().map(|mut n| {
                    if n.content.chars().count() > content_limit {
                        n.content = n.content.chars().take(content_limit).collect();
                    }
                    n
                }).collect();
                Ok((NoteBatch { notes }, AgentCallMeta { tokens: result.tokens, model_details: result.model_details }))
            }
            other => Err(SubstrateError::ProviderContract(format!("expected a notes variant, got {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::substrates::MockLlmSubstrate;
    use crate::domain::models::SourceRef;

    #[tokio::test]
    async fn decompose_queries_caps_at_max_queries() {
        let body = serde_json::json!({"type": "query_decomposition", "queries": ["a", "b", "c", "d"]}).to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = ResearchAgent::new(substrate, ModelTier::Fast);
        let (decomposition, _) = agent.decompose_queries("topic", 2).await.unwrap();
        assert_eq!(decomposition.queries.len(), 2);
    }

    #[tokio::test]
    async fn propose_notes_truncates_content_to_the_limit() {
        let body = serde_json::json!({
            "type": "notes",
            "notes": [{"content": "a".repeat(50), "source_ref": {"kind": "web", "url": "https://x.example/a"}, "tags": []}],
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = ResearchAgent::new(substrate, ModelTier::Mid);
        let (batch, _) = agent.propose_notes("q", "material", 10).await.unwrap();
        assert_eq!(batch.notes[0].content.chars().count(), 10);
    }

    #[tokio::test]
    async fn propose_notes_parses_source_ref_variants() {
        let url = "https://x.example/b".to_string();
        let body = serde_json::json!({
            "type": "notes",
            "notes": [{"content": "finding", "source_ref": {"kind": "web", "url": url}, "tags": ["tag1"]}],
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = ResearchAgent::new(substrate, ModelTier::Mid);
        let (batch, _) = agent.propose_notes("q", "material", 1_000).await.unwrap();
        assert!(matches!(batch.notes[0].source_ref, SourceRef::Web { .. }));
    }
}
