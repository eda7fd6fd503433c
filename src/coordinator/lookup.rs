//! The future returned by [`MetadataCoordinator::lookup`](super::MetadataCoordinator::lookup).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::types::LinkMetadata;

/// Pending result of a metadata lookup.
///
/// Resolves to `Some(metadata)` when usable metadata is available and to
/// `None` otherwise: the fetch failed, timed out, found nothing worth
/// showing, or the coordinator was dropped. A cache hit is ready on the
/// first poll.
///
/// Dropping a `Lookup` does not cancel the underlying fetch; other callers
/// of the same URL still get the result and the cache is still populated.
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Lookup {
    state: State,
}

#[derive(Debug)]
enum State {
    Ready(Option<LinkMetadata>),
    Waiting(oneshot::Receiver<Option<LinkMetadata>>),
}

impl Lookup {
    pub(crate) fn ready(metadata: Option<LinkMetadata>) -> Self {
        Self {
            state: State::Ready(metadata),
        }
    }

    pub(crate) fn waiting(receiver: oneshot::Receiver<Option<LinkMetadata>>) -> Self {
        Self {
            state: State::Waiting(receiver),
        }
    }

    /// Whether this lookup was answered from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }
}

impl Future for Lookup {
    type Output = Option<LinkMetadata>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Ready(metadata) => Poll::Ready(metadata.take()),
            // A dropped sender means the coordinator went away: no data.
            State::Waiting(receiver) => Pin::new(receiver).poll(cx).map(Result::unwrap_or_default),
        }
    }
}
