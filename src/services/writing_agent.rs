//! Writing Agent (§4.1 Phase 4): drafts or revises one section's markdown
//! from its assigned notes. §9 resolves `writing_passes` as "pass 1 is
//! the initial draft, passes 2..N are reflection-informed revisions".

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::SubstrateError;
use crate::domain::models::{AgentOutput, ModelTier, Note, Section, TokenCounts};
use crate::domain::ports::LlmSubstrate;

use super::agent_support::{call_structured, system_message, user_message};

const WRITING_SYSTEM_PROMPT: &str = "You write one section of a research report in markdown. Ground every claim in the supplied notes; do not introduce facts the notes do not support. Write only the section body, not a document title.";

pub struct WritingResult {
    pub section_id: Uuid,
    pub content_markdown: String,
    pub tokens: TokenCounts,
    pub model_details: String,
}

/// Inputs for one writing pass over a section (§4.1 Phase 4).
#[derive(Clone)]
pub struct WritingInput<'a> {
    pub section: &'a Section,
    pub assigned_notes: &'a [Note],
    /// `None` on pass 1 (initial draft); `Some(previous_markdown)` on
    /// revision passes, alongside reflection feedback for that section.
    pub previous_pass: Option<PreviousPass<'a>>,
    /// Preview of already-drafted preceding sections in this pass, for
    /// narrative continuity, already truncated to
    /// `previous_content_preview_chars`.
    pub preceding_sections_preview: &'a str,
    pub previous_content_preview_chars: usize,
    pub max_context_chars: usize,
}

#[derive(Clone)]
pub struct PreviousPass<'a> {
    pub content_markdown: &'a str,
    pub revision_guidance: &'a str,
}

pub struct WritingAgent {
    substrate: Arc<dyn LlmSubstrate>,
    tier: ModelTier,
}

impl WritingAgent {
    pub fn new(substrate: Arc<dyn LlmSubstrate>, tier: ModelTier) -> Self {
        Self { substrate, tier }
    }

    pub fn tier(&self) -> ModelTier {
        self.tier
    }

    pub async fn write(&self, input: WritingInput<'_>) -> Result<WritingResult, SubstrateError> {
        let notes_block = input
            .assigned_notes
            .iter()
            .map(|n| format!("- {} ({})", n.content, n.source_ref.citation_text()))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = format!("Section: {}\nDescription: {}\n\nNotes:\n{}", input.section.title, input.section.description, notes_block);
        if !input.preceding_sections_preview.is_empty() {
            let preview: String = input.preceding_sections_preview.chars().take(input.previous_content_preview_chars).collect();
            prompt.push_str(&format!("\n\nPreceding sections already drafted this pass (for continuity, do not repeat):\n{preview}"));
        }
        if let Some(previous) = &input.previous_pass {
            let preview: String = previous.content_markdown.chars().take(input.previous_content_preview_chars).collect();
            prompt.push_str(&format!("\n\nPrevious draft (revise, do not restart from scratch):\n{preview}\n\nRevision guidance:\n{}", previous.revision_guidance));
        }
        if prompt.chars().count() > input.max_context_chars {
            let skip = prompt.chars().count() - input.max_context_chars;
            prompt = prompt.chars().skip(skip).collect();
        }

        let messages = vec![system_message(WRITING_SYSTEM_PROMPT), user_message(prompt)];
        let result = call_structured(self.substrate.as_ref(), self.tier, messages, "draft", None).await?;
        match result.output {
            AgentOutput::Draft { section_id, content_markdown } => Ok(WritingResult { section_id, content_markdown, tokens: result.tokens, model_details: result.model_details }),
            other => Err(SubstrateError::ProviderContract(format!("expected a draft variant, got {other:?}"))),
        }
    }
}
