//! Builder for configuring coordinator instances

use std::sync::Arc;
use std::time::Duration;

use super::MetadataCoordinator;
use crate::config::PreviewConfig;
use crate::fetch::MetadataFetcher;
#[cfg(feature = "http")]
use crate::fetch::{HttpFetcher, HttpFetcherConfig};
use crate::{HuginnError, Result};

/// Main entry point for creating coordinators.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring a coordinator.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring coordinator instances.
///
/// ```rust
/// # use huginn::{Huginn, LinkMetadata, MetadataFetcher};
/// # use std::time::Duration;
/// # struct Static;
/// # #[async_trait::async_trait]
/// # impl MetadataFetcher for Static {
/// #     fn name(&self) -> &str { "static" }
/// #     async fn fetch(&self, _url: &str) -> huginn::Result<LinkMetadata> {
/// #         Ok(LinkMetadata::new().with_title("Example"))
/// #     }
/// # }
/// let previews = Huginn::builder()
///     .fetcher(Static)
///     .capacity(50)
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// assert_eq!(previews.config().capacity, 50);
/// # Ok::<(), huginn::HuginnError>(())
/// ```
pub struct HuginnBuilder {
    fetcher: Option<Arc<dyn MetadataFetcher>>,
    #[cfg(feature = "http")]
    http: Option<HttpFetcherConfig>,
    config: PreviewConfig,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            #[cfg(feature = "http")]
            http: None,
            config: PreviewConfig::default(),
        }
    }

    /// Use `fetcher` to retrieve metadata. Takes precedence over
    /// [`http`](Self::http).
    pub fn fetcher(mut self, fetcher: impl MetadataFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Fetch pages directly over HTTP with the given client settings.
    #[cfg(feature = "http")]
    pub fn http(mut self, config: HttpFetcherConfig) -> Self {
        self.http = Some(config);
        self
    }

    /// Replace the whole coordinator configuration.
    pub fn config(mut self, config: PreviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of cached URLs (default: 100).
    pub fn capacity(mut self, n: usize) -> Self {
        self.config.capacity = n;
        self
    }

    /// Set the per-fetch deadline (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the coordinator.
    ///
    /// Fails with [`HuginnError::NoFetcher`] when no fetch source was
    /// configured, and with [`HuginnError::Configuration`] for an invalid
    /// capacity or timeout.
    pub fn build(self) -> Result<MetadataCoordinator> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            #[cfg(feature = "http")]
            None if self.http.is_some() => {
                let config = self.http.unwrap_or_default();
                Arc::new(HttpFetcher::new(config)?)
            }
            None => return Err(HuginnError::NoFetcher),
        };
        MetadataCoordinator::new(fetcher, self.config)
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
