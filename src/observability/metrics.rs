//! Metrics collection.
//!
//! # Responsibilities
//! - Define dispatch metrics (per version and status, failures, 304s)
//! - Stay exporter-agnostic: the embedding binary installs a recorder
//!
//! # Metrics
//! - `api_dispatch_total` (counter): dispatches by negotiated version, status
//! - `api_dispatch_duration_seconds` (histogram): time spent inside `dispatch`
//! - `api_dispatch_failures_total` (counter): failures by error kind
//! - `api_not_modified_total` (counter): responses downgraded to 304
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without an installed recorder every call is a no-op

use std::time::Instant;

use metrics::{counter, histogram};

/// Record a completed dispatch.
pub fn record_dispatch(version: &str, status: u16, start: Instant) {
    counter!(
        "api_dispatch_total",
        "version" => version.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_dispatch_duration_seconds", "version" => version.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failure by kind (`not_found`, `internal`, ...).
pub fn record_failure(kind: &'static str) {
    counter!("api_dispatch_failures_total", "kind" => kind).increment(1);
}

/// Record a 304 downgrade.
pub fn record_not_modified() {
    counter!("api_not_modified_total").increment(1);
}
