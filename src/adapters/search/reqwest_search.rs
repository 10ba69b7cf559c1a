//! HTTP-backed web search adapter. Talks to a single configurable search
//! endpoint (any provider speaking the same `{query, max_results}` → JSON
//! results shape can be dropped in behind `endpoint_url`); rate-limited so
//! a busy mission cannot exceed the provider's request budget.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::Deserialize;

use crate::domain::errors::SubstrateError;
use crate::domain::ports::{Searcher, WebSearchResult};

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

#[derive(Debug, Deserialize)]
struct SearchApiResponse {
    results: Vec<SearchApiResult>,
}

#[derive(Debug, Deserialize)]
struct SearchApiResult {
    url: String,
    title: String,
    #[serde(default)]
    snippet: String,
}

pub struct ReqwestSearcher {
    provider_id: String,
    endpoint_url: String,
    client: reqwest::Client,
    limiter: Arc<Limiter>,
}

impl ReqwestSearcher {
    pub fn new(provider_id: impl Into<String>, endpoint_url: impl Into<String>, requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute.max(1)).unwrap());
        Self {
            provider_id: provider_id.into(),
            endpoint_url: endpoint_url.into(),
            client: reqwest::Client::new(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl Searcher for ReqwestSearcher {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&self.endpoint_url)
            .query(&[("q", query), ("max_results", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if response.status().is_server_error() || response.status().as_u16() == 429 {
            return Err(SubstrateError::Transient(format!("search provider returned {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(SubstrateError::Permanent(format!("search provider returned {}", response.status())));
        }

        let body: SearchApiResponse = response.json().await.map_err(|e| SubstrateError::ProviderContract(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .enumerate()
            .map(|(rank, r)| WebSearchResult { url: r.url, title: r.title, snippet: r.snippet, rank })
            .collect())
    }
}

pub(crate) fn classify_reqwest_error(err: &reqwest::Error) -> SubstrateError {
    if err.is_timeout() || err.is_connect() {
        SubstrateError::Transient(err.to_string())
    } else {
        SubstrateError::Permanent(err.to_string())
    }
}
