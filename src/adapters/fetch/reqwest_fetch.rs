//! HTTP-backed page fetcher implementing the "original URL, then fallback
//! mirror" strategy (§6): a paywalled or blocked source, or one that comes
//! back with no usable content, falls back to a configured mirror/cache
//! host before the fetch is treated as failed.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::SubstrateError;
use crate::domain::ports::{FetchEngine, FetchOptions, FetchedPage, Fetcher};

use crate::adapters::search::reqwest_search::classify_reqwest_error;

pub struct ReqwestFetcher {
    client: reqwest::Client,
    /// Optional mirror host prefix tried when the original fetch fails
    /// outright, or succeeds with empty content, e.g. a readability proxy
    /// or a JS-capable reader service for the `Complete` engine.
    fallback_prefix: Option<String>,
}

impl ReqwestFetcher {
    pub fn new(fallback_prefix: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), fallback_prefix }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration, options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
        url::Url::parse(url).map_err(|e| SubstrateError::Permanent(format!("invalid URL: {e}")))?;

        let response = self.client.get(url).timeout(timeout).send().await.map_err(|e| classify_reqwest_error(&e))?;

        if response.status().is_server_error() || response.status().as_u16() == 429 {
            return Err(SubstrateError::Transient(format!("fetch returned {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(SubstrateError::Permanent(format!("fetch returned {}", response.status())));
        }

        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        let content_markdown = match options.format {
            crate::domain::ports::FetchFormat::Html => body.clone(),
            crate::domain::ports::FetchFormat::Markdown | crate::domain::ports::FetchFormat::Text => strip_to_markdown(&body),
        };
        Ok(FetchedPage {
            url: url.to_string(),
            title: extract_title(&body),
            content_markdown,
            links: Some(extract_attrs(&body, "a", "href")),
            images: Some(extract_attrs(&body, "img", "src")),
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration, options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
        // §4.4: `Complete` always prefers the JS-capable fallback reader,
        // skipping the built-in extractor entirely.
        if options.engine == FetchEngine::Complete {
            if let Some(prefix) = &self.fallback_prefix {
                let mirrored = format!("{prefix}{url}");
                return self.fetch_once(&mirrored, timeout, options).await;
            }
        }

        match self.fetch_once(url, timeout, options).await {
            Ok(page) if page.content_markdown.trim().is_empty() => {
                let Some(prefix) = &self.fallback_prefix else {
                    return Ok(page);
                };
                let mirrored = format!("{prefix}{url}");
                match self.fetch_once(&mirrored, timeout, options).await {
                    Ok(fallback_page) => Ok(fallback_page),
                    Err(_) => Ok(page),
                }
            }
            Ok(page) => Ok(page),
            Err(original_err) => {
                let Some(prefix) = &self.fallback_prefix else {
                    return Err(original_err);
                };
                let mirrored = format!("{prefix}{url}");
                self.fetch_once(&mirrored, timeout, options).await.map_err(|_| original_err)
            }
        }
    }
}

fn extract_title(html: &str) -> Option<String> {
    let start = html.to_lowercase().find("<title>")?;
    let rest = &html[start + 7..];
    let end = rest.to_lowercase().find("</title>")?;
    Some(rest[..end].trim().to_string())
}

/// Minimal HTML-to-text conversion: strips tags, collapses whitespace.
/// Good enough for note extraction; not a full readability pipeline.
fn strip_to_markdown(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls `attr` values off every `<tag ...>` occurrence, e.g. every `href`
/// on an `<a>` or `src` on an `<img>`. Same tag-scanning approach as
/// `strip_to_markdown`, not a full HTML parse.
fn extract_attrs(html: &str, tag: &str, attr: &str) -> Vec<String> {
    let lower = html.to_lowercase();
    let tag_open = format!("<{tag}");
    let attr_needle = format!("{attr}=");
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&tag_open) {
        let tag_start = pos + start;
        let Some(tag_end) = lower[tag_start..].find('>') else { break };
        let tag_slice = &html[tag_start..tag_start + tag_end];
        let tag_slice_lower = &lower[tag_start..tag_start + tag_end];
        if let Some(attr_pos) = tag_slice_lower.find(&attr_needle) {
            let after = &tag_slice[attr_pos + attr_needle.len()..];
            if let Some(quote) = after.chars().next() {
                if quote == '"' || quote == '\'' {
                    if let Some(end) = after[1..].find(quote) {
                        out.push(after[1..1 + end].to_string());
                    }
                }
            }
        }
        pos = tag_start + tag_end + 1;
    }
    out
}
