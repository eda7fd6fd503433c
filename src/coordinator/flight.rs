//! Single-flight bookkeeping: the store, the in-flight slot and the queue.
//!
//! Pure state transitions with no tasks or timers, so every policy decision
//! is testable synchronously. [`super::handle`] wraps this in a mutex and
//! drives it from the fetch and timer tasks.
//!
//! Policy for misses:
//! - same URL as the in-flight or a queued request: join it
//! - nothing in flight: dispatch immediately
//! - otherwise: append to the queue; dispatched when the slot frees up,
//!   unless every caller waiting on it has gone away

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::cache::{Insertion, MetadataStore};
use crate::types::{CacheEntry, LinkMetadata};

/// Sending half of one caller's pending lookup.
pub(crate) type Waiter = oneshot::Sender<Option<LinkMetadata>>;

/// A request that must be handed to the fetcher now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dispatch {
    pub ticket: u64,
    pub url: String,
}

/// How a cache miss was admitted.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Joined the in-flight or a queued request for the same URL.
    Joined,
    /// Became the in-flight request.
    Dispatch(Dispatch),
    /// Waiting behind the in-flight request; `position` is 1-based.
    Queued { position: usize },
}

#[derive(Debug)]
struct PendingRequest {
    ticket: u64,
    url: String,
    waiters: Vec<Waiter>,
    dispatched_at: Option<Instant>,
}

/// A request taken out of the in-flight slot by completion or timeout.
#[derive(Debug)]
pub(crate) struct Settled {
    pub url: String,
    pub result: Option<LinkMetadata>,
    pub evicted: Option<String>,
    pub elapsed: Duration,
    /// The queue head, now in flight.
    pub next: Option<Dispatch>,
    waiters: Vec<Waiter>,
}

impl Settled {
    /// Number of callers that will receive the result.
    pub fn waiters(&self) -> usize {
        self.waiters.len()
    }

    /// Hand the result to every waiting caller.
    ///
    /// Callers that already went away are skipped.
    pub fn resolve(self) {
        for waiter in self.waiters {
            let _ = waiter.send(self.result.clone());
        }
    }
}

#[derive(Debug)]
pub(crate) struct FlightState {
    store: MetadataStore,
    in_flight: Option<PendingRequest>,
    queue: VecDeque<PendingRequest>,
    next_ticket: u64,
}

impl FlightState {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: MetadataStore::new(capacity),
            in_flight: None,
            queue: VecDeque::new(),
            next_ticket: 0,
        }
    }

    pub fn cached(&self, url: &str) -> Option<LinkMetadata> {
        self.store.get(url).cloned()
    }

    pub fn entries(&self) -> Vec<CacheEntry> {
        self.store.entries()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn in_flight_url(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|request| request.url.as_str())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Register a caller for a URL that missed the cache.
    pub fn admit(&mut self, url: String, waiter: Waiter, now: Instant) -> Admission {
        let existing = self
            .in_flight
            .iter_mut()
            .chain(self.queue.iter_mut())
            .find(|request| request.url == url);
        if let Some(request) = existing {
            request.waiters.push(waiter);
            return Admission::Joined;
        }

        self.next_ticket += 1;
        let mut request = PendingRequest {
            ticket: self.next_ticket,
            url,
            waiters: vec![waiter],
            dispatched_at: None,
        };

        if self.in_flight.is_none() {
            request.dispatched_at = Some(now);
            let dispatch = Dispatch {
                ticket: request.ticket,
                url: request.url.clone(),
            };
            self.in_flight = Some(request);
            Admission::Dispatch(dispatch)
        } else {
            self.queue.push_back(request);
            Admission::Queued {
                position: self.queue.len(),
            }
        }
    }

    /// Settle the in-flight request `ticket` with fetched metadata.
    ///
    /// Usable metadata is stored before this returns, so the cache already
    /// holds the entry by the time any waiter sees it. Returns `None` if
    /// `ticket` is no longer in flight (it timed out earlier).
    pub fn complete(
        &mut self,
        ticket: u64,
        metadata: LinkMetadata,
        now: Instant,
    ) -> Option<Settled> {
        let request = self.take_in_flight(ticket)?;
        let (result, evicted) = match self.store.insert(request.url.clone(), metadata.clone()) {
            Insertion::Rejected => (None, None),
            Insertion::Replaced => (Some(metadata), None),
            Insertion::Inserted { evicted } => (Some(metadata), evicted),
        };
        Some(self.settle(request, result, evicted, now))
    }

    /// Settle the in-flight request `ticket` with no data.
    ///
    /// Returns `None` if `ticket` already completed.
    pub fn expire(&mut self, ticket: u64, now: Instant) -> Option<Settled> {
        let request = self.take_in_flight(ticket)?;
        Some(self.settle(request, None, None, now))
    }

    fn take_in_flight(&mut self, ticket: u64) -> Option<PendingRequest> {
        if self.in_flight.as_ref()?.ticket == ticket {
            self.in_flight.take()
        } else {
            None
        }
    }

    fn settle(
        &mut self,
        request: PendingRequest,
        result: Option<LinkMetadata>,
        evicted: Option<String>,
        now: Instant,
    ) -> Settled {
        let elapsed = request
            .dispatched_at
            .map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
        let next = self.advance(now);
        Settled {
            url: request.url,
            result,
            evicted,
            elapsed,
            next,
            waiters: request.waiters,
        }
    }

    /// Move the queue head into the free slot.
    ///
    /// Requests whose callers have all dropped their lookups are discarded
    /// instead of fetched.
    fn advance(&mut self, now: Instant) -> Option<Dispatch> {
        debug_assert!(self.in_flight.is_none());
        while let Some(mut request) = self.queue.pop_front() {
            if request.waiters.iter().all(Waiter::is_closed) {
                debug!(url = %request.url, "dropping queued request nobody is waiting for");
                continue;
            }
            request.dispatched_at = Some(now);
            let dispatch = Dispatch {
                ticket: request.ticket,
                url: request.url.clone(),
            };
            self.in_flight = Some(request);
            return Some(dispatch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> LinkMetadata {
        LinkMetadata::new().with_title(title)
    }

    fn waiter() -> (Waiter, oneshot::Receiver<Option<LinkMetadata>>) {
        oneshot::channel()
    }

    fn dispatched(admission: Admission) -> Dispatch {
        match admission {
            Admission::Dispatch(dispatch) => dispatch,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn first_miss_dispatches() {
        let mut state = FlightState::new(4);
        let (tx, _rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, Instant::now()));

        assert_eq!(dispatch.url, "A");
        assert_eq!(state.in_flight_url(), Some("A"));
        assert_eq!(state.queued(), 0);
    }

    #[test]
    fn same_url_joins_in_flight_request() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, mut rx1) = waiter();
        let (tx2, mut rx2) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx1, now));
        assert_eq!(state.admit("A".into(), tx2, now), Admission::Joined);

        let settled = state.complete(dispatch.ticket, titled("a"), now).unwrap();
        assert_eq!(settled.waiters(), 2);
        settled.resolve();

        assert_eq!(rx1.try_recv().unwrap(), Some(titled("a")));
        assert_eq!(rx2.try_recv().unwrap(), Some(titled("a")));
    }

    #[test]
    fn different_url_is_queued_then_dispatched() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, _rx1) = waiter();
        let (tx2, _rx2) = waiter();
        let (tx3, _rx3) = waiter();
        let first = dispatched(state.admit("A".into(), tx1, now));
        assert_eq!(
            state.admit("B".into(), tx2, now),
            Admission::Queued { position: 1 }
        );
        assert_eq!(
            state.admit("C".into(), tx3, now),
            Admission::Queued { position: 2 }
        );

        let settled = state.complete(first.ticket, titled("a"), now).unwrap();
        let next = settled.next.clone().unwrap();
        assert_eq!(next.url, "B");
        assert_eq!(state.in_flight_url(), Some("B"));
        assert_eq!(state.queued(), 1);
    }

    #[test]
    fn same_url_joins_queued_request() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, _rx1) = waiter();
        let (tx2, _rx2) = waiter();
        let (tx3, _rx3) = waiter();
        dispatched(state.admit("A".into(), tx1, now));
        state.admit("B".into(), tx2, now);

        assert_eq!(state.admit("B".into(), tx3, now), Admission::Joined);
        assert_eq!(state.queued(), 1);
    }

    #[test]
    fn usable_result_is_cached_before_resolution() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx, mut rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, now));

        let settled = state.complete(dispatch.ticket, titled("a"), now).unwrap();
        assert_eq!(state.cached("A"), Some(titled("a")));
        assert!(rx.try_recv().is_err(), "not resolved yet");

        settled.resolve();
        assert_eq!(rx.try_recv().unwrap(), Some(titled("a")));
    }

    #[test]
    fn empty_result_resolves_none_and_is_not_cached() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx, mut rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, now));

        let settled = state
            .complete(dispatch.ticket, LinkMetadata::default(), now)
            .unwrap();
        assert_eq!(settled.result, None);
        settled.resolve();

        assert_eq!(rx.try_recv().unwrap(), None);
        assert_eq!(state.len(), 0);
        assert_eq!(state.in_flight_url(), None);
    }

    #[test]
    fn completion_after_expiry_is_ignored() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx, mut rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, now));

        state.expire(dispatch.ticket, now).unwrap().resolve();
        assert_eq!(rx.try_recv().unwrap(), None);

        assert!(state.complete(dispatch.ticket, titled("a"), now).is_none());
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn expiry_after_completion_is_ignored() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx, _rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, now));

        state.complete(dispatch.ticket, titled("a"), now).unwrap();
        assert!(state.expire(dispatch.ticket, now).is_none());
    }

    #[test]
    fn stale_ticket_does_not_settle_the_next_request() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, _rx1) = waiter();
        let (tx2, _rx2) = waiter();
        let first = dispatched(state.admit("A".into(), tx1, now));
        state.admit("B".into(), tx2, now);

        state.expire(first.ticket, now).unwrap();
        assert_eq!(state.in_flight_url(), Some("B"));

        // A's fetch finally answers; B must stay in flight.
        assert!(state.complete(first.ticket, titled("a"), now).is_none());
        assert_eq!(state.in_flight_url(), Some("B"));
        assert!(state.cached("A").is_none());
    }

    #[test]
    fn eviction_is_reported() {
        let mut state = FlightState::new(1);
        let now = Instant::now();
        for (url, title) in [("A", "a"), ("B", "b")] {
            let (tx, _rx) = waiter();
            let dispatch = dispatched(state.admit(url.into(), tx, now));
            let settled = state.complete(dispatch.ticket, titled(title), now).unwrap();
            if url == "B" {
                assert_eq!(settled.evicted.as_deref(), Some("A"));
            }
        }
        assert_eq!(state.entries().len(), 1);
        assert!(state.cached("B").is_some());
    }

    #[test]
    fn elapsed_is_measured_from_dispatch() {
        let mut state = FlightState::new(4);
        let start = Instant::now();
        let (tx, _rx) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx, start));

        let settled = state
            .expire(dispatch.ticket, start + Duration::from_secs(3))
            .unwrap();
        assert_eq!(settled.elapsed, Duration::from_secs(3));
    }

    #[test]
    fn dropped_caller_does_not_break_resolution() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, rx1) = waiter();
        let (tx2, mut rx2) = waiter();
        let dispatch = dispatched(state.admit("A".into(), tx1, now));
        state.admit("A".into(), tx2, now);
        drop(rx1);

        state.complete(dispatch.ticket, titled("a"), now).unwrap().resolve();
        assert_eq!(rx2.try_recv().unwrap(), Some(titled("a")));
    }

    #[test]
    fn abandoned_queued_request_is_skipped() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, _rx1) = waiter();
        let (tx2, rx2) = waiter();
        let (tx3, _rx3) = waiter();
        let first = dispatched(state.admit("A".into(), tx1, now));
        state.admit("B".into(), tx2, now);
        state.admit("C".into(), tx3, now);
        drop(rx2);

        let settled = state.expire(first.ticket, now).unwrap();
        assert_eq!(settled.next.map(|next| next.url).as_deref(), Some("C"));
        assert_eq!(state.queued(), 0);
    }

    #[test]
    fn queued_request_with_one_live_caller_is_kept() {
        let mut state = FlightState::new(4);
        let now = Instant::now();
        let (tx1, _rx1) = waiter();
        let (tx2, rx2) = waiter();
        let (tx3, _rx3) = waiter();
        let first = dispatched(state.admit("A".into(), tx1, now));
        state.admit("B".into(), tx2, now);
        state.admit("B".into(), tx3, now);
        drop(rx2);

        let settled = state.expire(first.ticket, now).unwrap();
        assert_eq!(settled.next.map(|next| next.url).as_deref(), Some("B"));
    }
}
