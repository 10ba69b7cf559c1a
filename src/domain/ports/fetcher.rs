//! Web fetch capability port (§4.1, §4.4, §6).

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::SubstrateError;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub content_markdown: String,
    pub links: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

/// Output format requested for a fetch (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFormat {
    #[default]
    Markdown,
    Html,
    Text,
}

/// Extraction engine requested for a fetch (§4.4): `Fast` favors the
/// built-in extractor, `Complete` favors the JS-capable fallback reader
/// even when the fast path would have succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchEngine {
    #[default]
    Default,
    Fast,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FetchOptions {
    pub format: FetchFormat,
    pub engine: FetchEngine,
}

/// Fetches and converts a single URL to markdown. Adapters implement the
/// "try the original URL, fall back to a cache/proxy on failure" strategy
/// from §6 internally; the port only sees the final outcome.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration, options: FetchOptions) -> Result<FetchedPage, SubstrateError>;
}
