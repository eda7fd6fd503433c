//! Channel bridge to an external scraper.
//!
//! The coordinator side holds a [`FetchBridge`]; the host holds the
//! [`FetchRequests`] stream. For every fetch the host receives a
//! [`FetchRequest`], loads the page however it likes and answers with
//! [`FetchRequest::complete`] or, when the scraper speaks JSON,
//! [`FetchRequest::complete_json`].
//!
//! ```rust,no_run
//! use huginn::fetch::FetchBridge;
//! use tokio_stream::StreamExt;
//!
//! # async fn run() -> huginn::Result<()> {
//! let (bridge, mut requests) = FetchBridge::channel(8);
//! let previews = huginn::Huginn::builder().fetcher(bridge).build()?;
//!
//! tokio::spawn(async move {
//!     while let Some(request) = requests.next().await {
//!         // e.g. load request.url() in a hidden web view, then:
//!         let _ = request.complete_json(r#"{"title":"Example"}"#);
//!     }
//! });
//!
//! let preview = previews.lookup("https://example.com").await;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use super::MetadataFetcher;
use crate::types::LinkMetadata;
use crate::{HuginnError, Result};

/// Default number of requests buffered towards the host.
pub const DEFAULT_BRIDGE_BUFFER: usize = 16;

/// Stream of fetch requests, consumed by the host.
pub type FetchRequests = ReceiverStream<FetchRequest>;

/// A single fetch the host is asked to perform.
///
/// Dropping it without answering fails the fetch with
/// [`HuginnError::BridgeClosed`].
#[derive(Debug)]
pub struct FetchRequest {
    url: String,
    reply: oneshot::Sender<LinkMetadata>,
}

impl FetchRequest {
    /// URL to load.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Answer with scraped metadata (possibly empty).
    pub fn complete(self, metadata: LinkMetadata) {
        // The coordinator may already have given up on this fetch.
        let _ = self.reply.send(metadata);
    }

    /// Answer with a JSON payload such as `{"title": "...", "image": {"url": "..."}}`.
    ///
    /// A malformed payload is answered with empty metadata, so waiting
    /// callers resolve straight away, and the parse error is returned.
    pub fn complete_json(self, payload: &str) -> Result<()> {
        match LinkMetadata::from_json(payload) {
            Ok(metadata) => {
                self.complete(metadata);
                Ok(())
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "malformed metadata payload");
                self.complete(LinkMetadata::default());
                Err(e)
            }
        }
    }
}

/// [`MetadataFetcher`] that forwards every fetch to a host-side stream.
#[derive(Debug, Clone)]
pub struct FetchBridge {
    requests: mpsc::Sender<FetchRequest>,
}

impl FetchBridge {
    /// Create a bridge and the matching request stream.
    ///
    /// `buffer` bounds how many unanswered requests can be queued towards
    /// the host; a coordinator keeps at most one outstanding, but late
    /// requests that were never answered still occupy a slot.
    pub fn channel(buffer: usize) -> (Self, FetchRequests) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { requests: tx }, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl MetadataFetcher for FetchBridge {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn fetch(&self, url: &str) -> Result<LinkMetadata> {
        let (reply, answer) = oneshot::channel();
        let request = FetchRequest {
            url: url.to_owned(),
            reply,
        };
        self.requests
            .send(request)
            .await
            .map_err(|_| HuginnError::BridgeClosed)?;
        answer.await.map_err(|_| HuginnError::BridgeClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn request_round_trip() {
        let (bridge, mut requests) = FetchBridge::channel(DEFAULT_BRIDGE_BUFFER);

        let host = tokio::spawn(async move {
            let request = requests.next().await.unwrap();
            assert_eq!(request.url(), "https://example.com");
            request.complete(LinkMetadata::new().with_title("Example"));
        });

        let metadata = bridge.fetch("https://example.com").await.unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Example"));
        host.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_request_fails_the_fetch() {
        let (bridge, mut requests) = FetchBridge::channel(1);

        tokio::spawn(async move {
            let request = requests.next().await.unwrap();
            drop(request);
        });

        let err = bridge.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, HuginnError::BridgeClosed));
    }

    #[tokio::test]
    async fn closed_host_fails_the_fetch() {
        let (bridge, requests) = FetchBridge::channel(1);
        drop(requests);

        let err = bridge.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, HuginnError::BridgeClosed));
    }

    #[tokio::test]
    async fn malformed_json_answers_with_empty_metadata() {
        let (bridge, mut requests) = FetchBridge::channel(1);

        let host = tokio::spawn(async move {
            let request = requests.next().await.unwrap();
            request.complete_json("{title").is_err()
        });

        let metadata = bridge.fetch("https://example.com").await.unwrap();
        assert!(!metadata.is_usable());
        assert!(host.await.unwrap());
    }
}
