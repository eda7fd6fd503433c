//! Fetch capability: how a coordinator obtains metadata for a URL.
//!
//! The coordinator only ever calls [`MetadataFetcher::fetch`]. It never
//! cancels a fetch and does not need the fetcher to enforce a deadline;
//! a fetch that never resolves is covered by the coordinator's own timeout.
//!
//! Two implementations ship with the crate:
//!
//! - [`FetchBridge`] hands requests to an external scraper (a hidden web
//!   view, a UI thread, another process) over a channel and waits for its
//!   answer.
//! - [`HttpFetcher`] (feature `http`) downloads the page and extracts Open
//!   Graph, Twitter card and plain HTML metadata itself.
//!
//! # Failure semantics
//!
//! Errors returned from `fetch` are logged and then treated exactly like
//! empty metadata: callers of the lookup get `None`, nothing is cached.

pub mod bridge;
#[cfg(feature = "http")]
mod html;
#[cfg(feature = "http")]
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::types::LinkMetadata;

pub use bridge::{FetchBridge, FetchRequest, FetchRequests};
#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherConfig};

/// Source of page metadata.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetcher name for logging and metrics.
    fn name(&self) -> &str;

    /// Retrieve metadata for `url`.
    ///
    /// Returning empty metadata is fine; it simply won't be cached.
    async fn fetch(&self, url: &str) -> Result<LinkMetadata>;
}

#[async_trait]
impl<T: MetadataFetcher + ?Sized> MetadataFetcher for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, url: &str) -> Result<LinkMetadata> {
        (**self).fetch(url).await
    }
}
