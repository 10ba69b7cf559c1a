//! Planning Agent (§4.1 Phase 1): produces and revises the research
//! outline and the initial-exploration question tree.

use std::sync::Arc;

use crate::domain::errors::SubstrateError;
use crate::domain::models::{ModelTier, Outline, PlanOutput, TokenCounts};
use crate::domain::ports::LlmSubstrate;

use super::agent_support::{call_structured, system_message, user_message};

const PLANNING_SYSTEM_PROMPT: &str = "You are the planning agent for a research mission. Produce a hierarchical outline and a breadth-first question tree covering the request. When revising an existing outline, only propose changes backed by concrete new findings and explain them in revision_notes.";

pub struct PlanningResult {
    pub plan: PlanOutput,
    pub tokens: TokenCounts,
    pub model_details: String,
}

#[derive(Clone)]
pub struct PlanningInput {
    pub mission_request: String,
    pub prior_outline: Option<Outline>,
    pub findings_summary: String,
    pub max_context_chars: usize,
}

pub struct PlanningAgent {
    substrate: Arc<dyn LlmSubstrate>,
    tier: ModelTier,
}

impl PlanningAgent {
    pub fn new(substrate: Arc<dyn LlmSubstrate>, tier: ModelTier) -> Self {
        Self { substrate, tier }
    }

    pub fn tier(&self) -> ModelTier {
        self.tier
    }

    pub async fn plan(&self, input: PlanningInput) -> Result<PlanningResult, SubstrateError> {
        let findings = truncate_context(&input.findings_summary, input.max_context_chars);
        let mut prompt = format!("Mission request:\n{}\n\nFindings so far:\n{}", input.mission_request, findings);
        if let Some(prior) = &input.prior_outline {
            let prior_json = serde_json::to_string(prior).unwrap_or_default();
            prompt.push_str(&format!("\n\nExisting outline (revise only with justification):\n{prior_json}"));
        }

        let messages = vec![system_message(PLANNING_SYSTEM_PROMPT), user_message(prompt)];
        let result = call_structured(self.substrate.as_ref(), self.tier, messages, "plan", None).await?;
        match result.output {
            crate::domain::models::AgentOutput::Plan(plan) => Ok(PlanningResult { plan, tokens: result.tokens, model_details: result.model_details }),
            other => Err(SubstrateError::ProviderContract(format!("expected a plan variant, got {other:?}"))),
        }
    }
}

/// Truncates from the front, keeping the most recent context (the tail is
/// the freshest material in an append-only findings summary).
fn truncate_context(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let skip = text.chars().count() - max_chars;
    text.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::substrates::MockLlmSubstrate;
    use crate::domain::models::Section;

    #[tokio::test]
    async fn plan_parses_a_valid_plan_response() {
        let body = serde_json::json!({
            "type": "plan",
            "outline": {"sections": [], "revision_notes": null},
            "question_tree": [],
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = PlanningAgent::new(substrate, ModelTier::Intelligent);
        let input = PlanningInput { mission_request: "research X".into(), prior_outline: None, findings_summary: String::new(), max_context_chars: 1_000 };
        let result = agent.plan(input).await.unwrap();
        assert!(result.plan.outline.sections.is_empty());
    }

    #[tokio::test]
    async fn plan_includes_prior_outline_for_revision_passes() {
        let body = serde_json::json!({
            "type": "plan",
            "outline": {"sections": [], "revision_notes": "no change needed"},
            "question_tree": [],
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = PlanningAgent::new(substrate, ModelTier::Intelligent);
        let prior = Outline { sections: vec![Section::new("Intro", "d", "r")], revision_notes: None };
        let input = PlanningInput { mission_request: "research X".into(), prior_outline: Some(prior), findings_summary: "some finding".into(), max_context_chars: 1_000 };
        let result = agent.plan(input).await.unwrap();
        assert_eq!(result.plan.outline.revision_notes.as_deref(), Some("no change needed"));
    }

    #[test]
    fn truncate_context_keeps_the_most_recent_tail() {
        let text = "0123456789";
        assert_eq!(truncate_context(text, 4), "6789");
        assert_eq!(truncate_context(text, 20), "0123456789");
    }
}
