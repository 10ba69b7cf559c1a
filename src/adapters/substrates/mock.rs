//! Mock LLM substrate for tests and the smoke binary: no network calls,
//! returns canned or caller-configured responses per agent output variant.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::SubstrateError;
use crate::domain::models::TokenCounts;
use crate::domain::ports::llm_substrate::{ChatRequest, ChatResponse, LlmSubstrate};

/// A scripted response keyed by the `expects_variant` tag of the request
/// that should receive it. Requests with no matching script fall back to
/// `default_response`.
#[derive(Clone)]
pub struct MockLlmSubstrate {
    default_response: String,
    scripted: Arc<RwLock<HashMap<&'static str, Vec<String>>>>,
}

impl MockLlmSubstrate {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self { default_response: default_response.into(), scripted: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Queues a response to return the next time a request expects
    /// `variant`. Responses for the same variant are consumed in FIFO order.
    pub async fn push_response(&self, variant: &'static str, response: impl Into<String>) {
        self.scripted.write().await.entry(variant).or_default().push(response.into());
    }

    async fn next_response(&self, variant: Option<&'static str>) -> String {
        if let Some(variant) = variant {
            let mut scripted = self.scripted.write().await;
            if let Some(queue) = scripted.get_mut(variant) {
                if !queue.is_empty() {
                    return queue.remove(0);
                }
            }
        }
        self.default_response.clone()
    }
}

#[async_trait]
impl LlmSubstrate for MockLlmSubstrate {
    fn substrate_id(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SubstrateError> {
        let content = self.next_response(request.expects_variant).await;
        let prompt_tokens: u64 = request.messages.iter().map(|m| m.content.len() as u64 / 4).sum();
        Ok(ChatResponse {
            content,
            tokens: TokenCounts { prompt: prompt_tokens, completion: 32, native: None },
            model_details: format!("mock:{}", request.tier.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::llm_substrate::{ChatMessage, ChatRole};
    use crate::domain::models::ModelTier;

    fn request(expects_variant: Option<&'static str>) -> ChatRequest {
        ChatRequest {
            tier: ModelTier::Fast,
            messages: vec![ChatMessage { role: ChatRole::User, content: "hello".into() }],
            expects_variant,
            max_output_tokens: None,
        }
    }

    #[tokio::test]
    async fn falls_back_to_default_response_with_no_script() {
        let substrate = MockLlmSubstrate::new("default text");
        let response = substrate.chat(request(None)).await.unwrap();
        assert_eq!(response.content, "default text");
    }

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_fifo_order() {
        let substrate = MockLlmSubstrate::new("default");
        substrate.push_response("plan", "first").await;
        substrate.push_response("plan", "second").await;

        let r1 = substrate.chat(request(Some("plan"))).await.unwrap();
        let r2 = substrate.chat(request(Some("plan"))).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }
}
