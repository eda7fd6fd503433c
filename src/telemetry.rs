//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `fetcher` — fetcher name (e.g. "http", "bridge")
//! - `status` — fetch outcome: "usable", "empty" or "error"

/// Lookups answered from the cache.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Lookups that missed the cache (including coalesced ones).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Lookups that joined an in-flight or queued request for the same URL.
pub const LOOKUPS_COALESCED_TOTAL: &str = "huginn_lookups_coalesced_total";

/// Fetches that finished before their deadline.
///
/// Labels: `fetcher`, `status` ("usable" | "empty" | "error").
pub const FETCHES_TOTAL: &str = "huginn_fetches_total";

/// Fetch duration in seconds, for fetches that finished before their deadline.
///
/// Labels: `fetcher`.
pub const FETCH_DURATION_SECONDS: &str = "huginn_fetch_duration_seconds";

/// Fetches abandoned because the deadline fired first.
///
/// Labels: `fetcher`.
pub const FETCH_TIMEOUTS_TOTAL: &str = "huginn_fetch_timeouts_total";

/// Fetch results that arrived after their deadline and were discarded.
///
/// Labels: `fetcher`.
pub const LATE_RESULTS_TOTAL: &str = "huginn_late_results_total";

/// Entries evicted from a full cache.
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";
