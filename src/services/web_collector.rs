//! Web Search/Fetch abstraction (§4.4): wraps a `Searcher` and a
//! `Fetcher` behind a single collection step used by the Research Agent.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{FetchOptions, FetchedPage, Fetcher, Searcher, WebSearchResult};

/// Per-call fetch timeout (§4.4: "per-call, configurable").
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq)]
pub struct WebFinding {
    pub result: WebSearchResult,
    pub page: Option<FetchedPage>,
}

pub struct WebCollector {
    searcher: Arc<dyn Searcher>,
    fetcher: Arc<dyn Fetcher>,
}

impl WebCollector {
    pub fn new(searcher: Arc<dyn Searcher>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { searcher, fetcher }
    }

    /// Searches for `query`, then fetches each hit's page content.
    /// §4.4: a failed search is "retried once then surfaced as zero
    /// results (warning, not fatal)"; a failed fetch for one hit is
    /// dropped from the result set rather than failing the whole
    /// collection.
    pub async fn collect(&self, query: &str, max_results: usize) -> Vec<WebFinding> {
        let results = match self.searcher.search(query, max_results).await {
            Ok(results) => results,
            Err(first_err) => match self.searcher.search(query, max_results).await {
                Ok(results) => results,
                Err(second_err) => {
                    tracing::warn!(%query, first_error = %first_err, second_error = %second_err, "web search failed twice, returning zero results");
                    Vec::new()
                }
            },
        };

        let mut findings = Vec::with_capacity(results.len());
        for result in results {
            let page = match self.fetcher.fetch(&result.url, FETCH_TIMEOUT, FetchOptions::default()).await {
                Ok(page) => Some(page),
                Err(err) => {
                    tracing::warn!(url = %result.url, error = %err, "fetch failed for search hit, dropping page content");
                    None
                }
            };
            findings.push(WebFinding { result, page });
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::domain::errors::SubstrateError;

    struct FlakySearcher {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl Searcher for FlakySearcher {
        fn provider_id(&self) -> &str {
            "flaky"
        }
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(SubstrateError::Transient("rate limited".into()))
            } else {
                Ok(vec![WebSearchResult { url: "https://example.com/a".into(), title: "A".into(), snippet: "snippet".into(), rank: 0 }])
            }
        }
    }

    struct AlwaysFailsSearcher;

    #[async_trait]
    impl Searcher for AlwaysFailsSearcher {
        fn provider_id(&self) -> &str {
            "broken"
        }
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError> {
            Err(SubstrateError::Permanent("provider down".into()))
        }
    }

    struct StubFetcher;

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, _timeout: std::time::Duration, _options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
            Ok(FetchedPage { url: url.to_string(), title: Some("title".into()), content_markdown: "body".into(), links: None, images: None })
        }
    }

    struct AlwaysFailsFetcher;

    #[async_trait]
    impl Fetcher for AlwaysFailsFetcher {
        async fn fetch(&self, _url: &str, _timeout: std::time::Duration, _options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
            Err(SubstrateError::Transient("timeout".into()))
        }
    }

    #[tokio::test]
    async fn retries_search_once_before_giving_up() {
        let collector = WebCollector::new(Arc::new(FlakySearcher { attempts: AtomicU32::new(0) }), Arc::new(StubFetcher));
        let findings = collector.collect("query", 5).await;
        assert_eq!(findings.len(), 1);
    }

    #[tokio::test]
    async fn search_failing_twice_yields_zero_results_not_an_error() {
        let collector = WebCollector::new(Arc::new(AlwaysFailsSearcher), Arc::new(StubFetcher));
        let findings = collector.collect("query", 5).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_drops_the_page_but_keeps_the_search_result() {
        let collector = WebCollector::new(Arc::new(FlakySearcher { attempts: AtomicU32::new(1) }), Arc::new(AlwaysFailsFetcher));
        let findings = collector.collect("query", 5).await;
        assert_eq!(findings.len(), 1);
        assert!(findings[0].page.is_none());
    }
}
