//! Shared plumbing for the four agent wrappers (§4.1, §7
//! `ProviderContractError`): every agent issues one `chat_structured`
//! call and, on a schema mismatch, reformats the request once before
//! giving up.

use crate::domain::errors::SubstrateError;
use crate::domain::models::{AgentOutput, ModelTier, TokenCounts};
use crate::domain::ports::{ChatMessage, ChatRequest, ChatRole, LlmSubstrate};

/// Result of one agent call: the parsed output plus the tokens/model
/// details needed to build an `ExecutionLog` entry.
pub struct AgentCallResult {
    pub output: AgentOutput,
    pub tokens: TokenCounts,
    pub model_details: String,
}

const REFORMAT_NUDGE: &str = "Your previous response did not match the required JSON schema. Respond with ONLY valid JSON for the requested schema, with no surrounding prose.";

/// Issues `messages` as a structured request for `variant`, retrying
/// exactly once with a reformat nudge on `ProviderContract` (§7: "one
/// reformat retry, then escalate").
pub async fn call_structured(substrate: &dyn LlmSubstrate, tier: ModelTier, mut messages: Vec<ChatMessage>, variant: &'static str, max_output_tokens: Option<u32>) -> Result<AgentCallResult, SubstrateError> {
    let request = ChatRequest { tier, messages: messages.clone(), expects_variant: Some(variant), max_output_tokens };
    match try_once(substrate, request).await {
        Ok(result) => Ok(result),
        Err(SubstrateError::ProviderContract(detail)) => {
            messages.push(ChatMessage { role: ChatRole::User, content: REFORMAT_NUDGE.to_string() });
            let retry_request = ChatRequest { tier, messages, expects_variant: Some(variant), max_output_tokens };
            try_once(substrate, retry_request).await.map_err(|err| match err {
                SubstrateError::ProviderContract(second_detail) => SubstrateError::ProviderContract(format!("{detail}; retry also failed: {second_detail}")),
                other => other,
            })
        }
        Err(other) => Err(other),
    }
}

async fn try_once(substrate: &dyn LlmSubstrate, request: ChatRequest) -> Result<AgentCallResult, SubstrateError> {
    let response = substrate.chat(request).await?;
    let output = serde_json::from_str(&response.content).map_err(|e| SubstrateError::ProviderContract(e.to_string()))?;
    Ok(AgentCallResult { output, tokens: response.tokens, model_details: response.model_details })
}

pub fn system_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage { role: ChatRole::System, content: content.into() }
}

pub fn user_message(content: impl Into<String>) -> ChatMessage {
    ChatMessage { role: ChatRole::User, content: content.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::domain::ports::ChatResponse;

    struct ScriptedSubstrate {
        responses: Vec<Result<&'static str, SubstrateError>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmSubstrate for ScriptedSubstrate {
        fn substrate_id(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, SubstrateError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match &self.responses[i] {
                Ok(body) => Ok(ChatResponse { content: body.to_string(), tokens: TokenCounts::default(), model_details: "scripted-v1".into() }),
                Err(e) => Err(e.clone()),
            }
        }
    }

    #[tokio::test]
    async fn succeeds_first_try_when_output_parses() {
        let substrate: Arc<dyn LlmSubstrate> = Arc::new(ScriptedSubstrate { responses: vec![Ok(r#"{"type":"query_decomposition","queries":["a"]}"#)], calls: AtomicU32::new(0) });
        let result = call_structured(&*substrate, ModelTier::Fast, vec![user_message("go")], "query_decomposition", None).await.unwrap();
        assert!(matches!(result.output, AgentOutput::QueryDecomposition(_)));
    }

    #[tokio::test]
    async fn reformats_once_after_a_malformed_response() {
        let substrate: Arc<dyn LlmSubstrate> =
            Arc::new(ScriptedSubstrate { responses: vec![Ok("not json"), Ok(r#"{"type":"query_decomposition","queries":["a"]}"#)], calls: AtomicU32::new(0) });
        let result = call_structured(&*substrate, ModelTier::Fast, vec![user_message("go")], "query_decomposition", None).await.unwrap();
        assert!(matches!(result.output, AgentOutput::QueryDecomposition(_)));
    }

    #[tokio::test]
    async fn gives_up_after_the_reformat_retry_also_fails() {
        let substrate: Arc<dyn LlmSubstrate> = Arc::new(ScriptedSubstrate { responses: vec![Ok("not json"), Ok("still not json")], calls: AtomicU32::new(0) });
        let err = call_structured(&*substrate, ModelTier::Fast, vec![user_message("go")], "query_decomposition", None).await.unwrap_err();
        assert!(matches!(err, SubstrateError::ProviderContract(_)));
    }

    #[tokio::test]
    async fn non_contract_errors_are_not_retried() {
        let substrate: Arc<dyn LlmSubstrate> = Arc::new(ScriptedSubstrate { responses: vec![Err(SubstrateError::Permanent("bad key".into()))], calls: AtomicU32::new(0) });
        let err = call_structured(&*substrate, ModelTier::Fast, vec![user_message("go")], "query_decomposition", None).await.unwrap_err();
        assert!(matches!(err, SubstrateError::Permanent(_)));
    }
}
