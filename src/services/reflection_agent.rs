//! Reflection Agent (§4.1 Phase 3/4): critiques the current draft and
//! note coverage, surfacing gaps, new goals/thoughts, and an optional
//! replan signal.

use std::sync::Arc;

use crate::domain::errors::SubstrateError;
use crate::domain::models::{AgentOutput, Critique, ModelTier, TokenCounts};
use crate::domain::ports::LlmSubstrate;

use super::agent_support::{call_structured, system_message, user_message};

const REFLECTION_SYSTEM_PROMPT: &str = "You critique a research mission's progress. Identify concrete coverage gaps tied to specific sections, propose new goals or thoughts only when justified by evidence, and set trigger_replan only when the existing outline can no longer accommodate the findings.";

pub struct ReflectionResult {
    pub critique: Critique,
    pub tokens: TokenCounts,
    pub model_details: String,
}

#[derive(Clone)]
pub struct ReflectionInput {
    pub outline_summary: String,
    pub notes_summary: String,
    pub goal_pad_summary: String,
}

pub struct ReflectionAgent {
    substrate: Arc<dyn LlmSubstrate>,
    tier: ModelTier,
}

impl ReflectionAgent {
    pub fn new(substrate: Arc<dyn LlmSubstrate>, tier: ModelTier) -> Self {
        Self { substrate, tier }
    }

    pub fn tier(&self) -> ModelTier {
        self.tier
    }

    pub async fn reflect(&self, input: ReflectionInput) -> Result<ReflectionResult, SubstrateError> {
        let prompt = format!(
            "Current outline:\n{}\n\nNotes gathered so far:\n{}\n\nActive goals:\n{}",
            input.outline_summary, input.notes_summary, input.goal_pad_summary
        );
        let messages = vec![system_message(REFLECTION_SYSTEM_PROMPT), user_message(prompt)];
        let result = call_structured(self.substrate.as_ref(), self.tier, messages, "critique", None).await?;
        match result.output {
            AgentOutput::Critique(critique) => Ok(ReflectionResult { critique, tokens: result.tokens, model_details: result.model_details }),
            other => Err(SubstrateError::ProviderContract(format!("expected a critique variant, got {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::substrates::MockLlmSubstrate;

    #[tokio::test]
    async fn reflect_parses_gaps_and_replan_signal() {
        let body = serde_json::json!({
            "type": "critique",
            "gaps": [{"section_id": null, "description": "missing comparative data"}],
            "new_goals": [],
            "new_thoughts": [],
            "sections_needing_revision": [],
            "trigger_replan": true,
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = ReflectionAgent::new(substrate, ModelTier::Intelligent);
        let input = ReflectionInput { outline_summary: "o".into(), notes_summary: "n".into(), goal_pad_summary: "g".into() };
        let result = agent.reflect(input).await.unwrap();
        assert!(result.critique.has_gaps());
        assert!(result.critique.trigger_replan);
    }

    #[tokio::test]
    async fn reflect_with_no_gaps_does_not_trigger_replan() {
        let body = serde_json::json!({
            "type": "critique",
            "gaps": [],
            "new_goals": [],
            "new_thoughts": [],
            "sections_needing_revision": [],
            "trigger_replan": false,
        })
        .to_string();
        let substrate = Arc::new(MockLlmSubstrate::new(body));
        let agent = ReflectionAgent::new(substrate, ModelTier::Intelligent);
        let input = ReflectionInput { outline_summary: "o".into(), notes_summary: "n".into(), goal_pad_summary: "g".into() };
        let result = agent.reflect(input).await.unwrap();
        assert!(!result.critique.has_gaps());
        assert!(!result.critique.trigger_replan);
    }
}
