//! Web search capability port (§4.1, §6).

use async_trait::async_trait;

use crate::domain::errors::SubstrateError;

#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// 0-based position in the provider's result ordering (§4.4).
    pub rank: usize,
}

#[async_trait]
pub trait Searcher: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError>;
}
