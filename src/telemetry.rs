//! Telemetry metric name constants.
//!
//! Centralised metric names for bifrost operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bifrost_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `code` — envelope status code of a finished request
//! - `operation` — cache operation (e.g. "completion")

/// Total requests processed by the orchestrator.
///
/// Labels: `code` (envelope status, e.g. "200", "429").
pub const REQUESTS_TOTAL: &str = "bifrost_requests_total";

/// Total upstream retry attempts (not counting the initial request).
pub const UPSTREAM_RETRIES_TOTAL: &str = "bifrost_upstream_retries_total";

/// Upstream call duration in seconds, successful calls only.
pub const UPSTREAM_DURATION_SECONDS: &str = "bifrost_upstream_duration_seconds";

/// Total cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "bifrost_cache_hits_total";

/// Total cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "bifrost_cache_misses_total";

/// Total requests rejected by the per-user rate limit.
pub const RATE_LIMITED_TOTAL: &str = "bifrost_rate_limited_total";
