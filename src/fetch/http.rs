//! HTTP metadata fetcher.
//!
//! Downloads the page with `reqwest` and extracts metadata from the HTML.
//! Non-HTML responses (images, PDFs, JSON) yield empty metadata rather than
//! an error, so they simply never show a preview. Pages are decoded by the
//! charset from `Content-Type` or `<meta charset>`, falling back to UTF-8.

use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url, redirect};
use tracing::debug;

use super::{MetadataFetcher, html};
use crate::types::LinkMetadata;
use crate::{HuginnError, Result};

/// Configuration for [`HttpFetcher`].
///
/// ```rust
/// # use huginn::fetch::HttpFetcherConfig;
/// # use std::time::Duration;
/// let config = HttpFetcherConfig::new()
///     .user_agent("my-app/1.0")
///     .timeout(Duration::from_secs(5))
///     .max_body_bytes(256 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// `User-Agent` header. Default: a desktop-browser-like string, since
    /// many sites serve bots a page without preview tags.
    pub user_agent: String,
    /// Per-request HTTP timeout. Default: 10 seconds.
    pub timeout: Duration,
    /// Maximum redirects followed. Default: 5.
    pub max_redirects: usize,
    /// Maximum number of body bytes read. Larger pages are cut off and
    /// metadata is extracted from the prefix. Default: 512 KiB.
    pub max_body_bytes: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; huginn/0.1; +link-preview)".to_string(),
            timeout: Duration::from_secs(10),
            max_redirects: 5,
            max_body_bytes: 512 * 1024,
        }
    }
}

impl HttpFetcherConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the redirect limit.
    pub fn max_redirects(mut self, n: usize) -> Self {
        self.max_redirects = n;
        self
    }

    /// Set the maximum body size.
    pub fn max_body_bytes(mut self, n: usize) -> Self {
        self.max_body_bytes = n;
        self
    }
}

/// [`MetadataFetcher`] that downloads pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Build a fetcher from the given configuration.
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| HuginnError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Build a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpFetcherConfig::default())
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<LinkMetadata> {
        let page_url = Url::parse(url)
            .map_err(|e| HuginnError::InvalidInput(format!("invalid URL '{url}': {e}")))?;
        if !matches!(page_url.scheme(), "http" | "https") {
            return Err(HuginnError::InvalidInput(format!(
                "unsupported URL scheme: {}",
                page_url.scheme()
            )));
        }

        let mut response = self.client.get(page_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HuginnError::Api {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        // Relative image URLs resolve against the page we ended up on.
        let final_url = response.url().clone();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = &content_type
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            debug!(url, content_type, "not an HTML page, no preview metadata");
            return Ok(LinkMetadata::default());
        }

        // Preview tags live in <head>, so a prefix of a large page is enough.
        let limit = self.max_body_bytes;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = limit - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url, limit, "body limit reached, extracting from the prefix");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let charset = content_type.as_deref().and_then(header_charset);
        let html = decode(&body, charset);
        Ok(html::extract(&html, &final_url))
    }
}
