//! LLM capability port (§6, §9).
//!
//! The core never hardcodes a vendor or model name; it asks for a
//! [`ModelTier`] and gets back either free text or a parsed
//! [`AgentOutput`] variant. Concrete substrates (Anthropic, OpenAI, a
//! local model server) live behind `adapters::substrates`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::SubstrateError;
use crate::domain::models::{AgentOutput, ModelTier, TokenCounts};

/// One turn of conversation sent to the substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A request for a chat completion, optionally constrained to one of the
/// [`AgentOutput`] variants (§9 "dynamic structured outputs").
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub tier: ModelTier,
    pub messages: Vec<ChatMessage>,
    /// When set, the substrate is instructed to emit JSON matching this
    /// `AgentOutput` variant tag; the adapter is responsible for the
    /// reformat-retry described in §7 on a `ProviderContract` error.
    pub expects_variant: Option<&'static str>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens: TokenCounts,
    pub model_details: String,
}

/// Capability port for LLM chat completions.
#[async_trait]
pub trait LlmSubstrate: Send + Sync {
    fn substrate_id(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SubstrateError>;

    /// Convenience wrapper: issues a chat request constrained to one
    /// `AgentOutput` variant and parses the response. Callers get a
    /// `ProviderContract` error on a parse failure rather than handling
    /// JSON themselves.
    async fn chat_structured(&self, request: ChatRequest) -> Result<AgentOutput, SubstrateError> {
        let response = self.chat(request).await?;
        serde_json::from_str(&response.content).map_err(|e| SubstrateError::ProviderContract(e.to_string()))
    }
}
