//! Coordinator handle and the fetch/timeout tasks that drive it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::flight::{Admission, Dispatch, FlightState, Settled};
use super::lookup::Lookup;
use crate::config::PreviewConfig;
use crate::fetch::MetadataFetcher;
use crate::types::{CacheEntry, LinkMetadata};
use crate::{Result, telemetry};

/// Bounded link-metadata cache with single-flight fetching.
///
/// Cheap to clone; clones share one cache and one in-flight slot. Separate
/// coordinators never share state.
///
/// # Concurrency
///
/// At most one fetch is outstanding. A lookup for a URL that is already
/// being fetched, or already queued, joins that request. A lookup for any
/// other URL is queued and fetched once the slot is free; its deadline
/// starts when it is dispatched, not when it is queued.
///
/// # Timeouts
///
/// If the fetcher does not answer within [`PreviewConfig::timeout`], all
/// callers for that URL get `None` and the next queued URL is dispatched.
/// The fetch itself keeps running; whatever it eventually returns is
/// discarded and not cached.
#[derive(Clone)]
pub struct MetadataCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<FlightState>,
    fetcher: Arc<dyn MetadataFetcher>,
    config: PreviewConfig,
}

impl MetadataCoordinator {
    /// Create a coordinator around `fetcher`.
    ///
    /// Fails with [`HuginnError::Configuration`](crate::HuginnError::Configuration)
    /// if `config` is invalid.
    pub fn new(fetcher: Arc<dyn MetadataFetcher>, config: PreviewConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FlightState::new(config.capacity)),
                fetcher,
                config,
            }),
        })
    }

    /// Metadata for `url`, from the cache or a fresh fetch.
    ///
    /// The URL is used verbatim as the cache key; callers normalize it.
    ///
    /// # Panics
    ///
    /// On a cache miss this spawns tasks, so it must be called from within
    /// a Tokio runtime.
    pub fn lookup(&self, url: impl Into<String>) -> Lookup {
        let url = url.into();
        let mut state = self.shared.lock();

        if let Some(metadata) = state.cached(&url) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
            debug!(url = %url, "link metadata cache hit");
            return Lookup::ready(Some(metadata));
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);

        let (waiter, receiver) = oneshot::channel();
        let admission = state.admit(url.clone(), waiter, Instant::now());
        match admission {
            Admission::Joined => {
                metrics::counter!(telemetry::LOOKUPS_COALESCED_TOTAL).increment(1);
                debug!(url = %url, "joined pending metadata request");
            }
            Admission::Queued { position } => {
                debug!(url = %url, position, "metadata request queued");
            }
            Admission::Dispatch(dispatch) => {
                drop(state);
                self.shared.dispatch(dispatch);
            }
        }
        Lookup::waiting(receiver)
    }

    /// Cached metadata for `url`, without fetching.
    pub fn get(&self, url: &str) -> Option<LinkMetadata> {
        self.shared.lock().cached(url)
    }

    /// Snapshot of the cache, oldest entry first.
    pub fn current_cache(&self) -> Vec<CacheEntry> {
        self.shared.lock().entries()
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// URL currently being fetched, if any.
    pub fn in_flight(&self) -> Option<String> {
        self.shared.lock().in_flight_url().map(str::to_owned)
    }

    /// Number of distinct URLs waiting for the fetch slot.
    pub fn queued(&self) -> usize {
        self.shared.lock().queued()
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.shared.config
    }

    /// Name of the underlying fetcher.
    pub fn fetcher_name(&self) -> &str {
        self.shared.fetcher.name()
    }
}

impl std::fmt::Debug for MetadataCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCoordinator")
            .field("fetcher", &self.shared.fetcher.name())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FlightState> {
        // State transitions never panic midway, so a poisoned lock still
        // holds consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the fetch and its deadline for the request now in flight.
    ///
    /// Both tasks hold weak references: once every coordinator handle is
    /// dropped, their results go nowhere. A fetch that finishes first
    /// cancels its deadline.
    fn dispatch(self: &Arc<Self>, Dispatch { ticket, url }: Dispatch) {
        debug!(url = %url, ticket, fetcher = self.fetcher.name(), "dispatching metadata fetch");

        let weak = Arc::downgrade(self);
        let timeout = self.config.timeout;
        let deadline = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = weak.upgrade() {
                shared.on_timeout(ticket);
            }
        });

        let fetcher = Arc::clone(&self.fetcher);
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&url).await;
            deadline.abort();
            if let Some(shared) = weak.upgrade() {
                shared.on_fetch_complete(ticket, &url, outcome);
            }
        });
    }

    fn on_fetch_complete(self: &Arc<Self>, ticket: u64, url: &str, outcome: Result<LinkMetadata>) {
        let fetcher = self.fetcher.name().to_owned();
        let (metadata, status) = match outcome {
            Ok(metadata) if metadata.is_usable() => (metadata, "usable"),
            Ok(metadata) => (metadata, "empty"),
            Err(e) => {
                warn!(url, fetcher = %fetcher, error = %e, "metadata fetch failed");
                (LinkMetadata::default(), "error")
            }
        };

        let settled = self.lock().complete(ticket, metadata, Instant::now());
        let Some(settled) = settled else {
            metrics::counter!(telemetry::LATE_RESULTS_TOTAL, "fetcher" => fetcher).increment(1);
            debug!(url, ticket, status, "discarding metadata that arrived after its deadline");
            return;
        };

        metrics::counter!(telemetry::FETCHES_TOTAL,
            "fetcher" => fetcher.clone(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::FETCH_DURATION_SECONDS, "fetcher" => fetcher)
            .record(settled.elapsed.as_secs_f64());

        if let Some(evicted) = &settled.evicted {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            debug!(url = %settled.url, evicted = %evicted, "cache full, evicted oldest entry");
        }
        debug!(
            url = %settled.url,
            status,
            waiters = settled.waiters(),
            elapsed_ms = settled.elapsed.as_millis() as u64,
            "metadata fetch finished"
        );

        self.finish(settled);
    }

    fn on_timeout(self: &Arc<Self>, ticket: u64) {
        // Already settled by the fetch: nothing to do.
        let Some(settled) = self.lock().expire(ticket, Instant::now()) else {
            return;
        };

        metrics::counter!(telemetry::FETCH_TIMEOUTS_TOTAL,
            "fetcher" => self.fetcher.name().to_owned(),
        )
        .increment(1);
        warn!(
            url = %settled.url,
            timeout_ms = self.config.timeout.as_millis() as u64,
            waiters = settled.waiters(),
            "metadata fetch timed out"
        );

        self.finish(settled);
    }

    fn finish(self: &Arc<Self>, mut settled: Settled) {
        let next = settled.next.take();
        settled.resolve();
        if let Some(next) = next {
            self.dispatch(next);
        }
    }
}
