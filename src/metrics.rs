//! Prometheus metrics for route resolution and request dispatch.
//!
//! This module provides metrics for:
//! - Dispatch latency per HTTP method
//! - Dispatch outcomes (success, error status, failure)
//! - Route resolution hits and misses

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Dispatch latency metric name.
pub const METRIC_DISPATCH_LATENCY: &str = "dispatch_latency_ms";
/// Dispatches started counter metric name.
pub const METRIC_DISPATCHES: &str = "dispatches_total";
/// Dispatches that ended in ledger status `success`.
pub const METRIC_DISPATCH_SUCCESSES: &str = "dispatch_successes_total";
/// Dispatches that ended in ledger status `error`.
pub const METRIC_DISPATCH_FAILURES: &str = "dispatch_failures_total";
/// Routes resolved counter metric name.
pub const METRIC_ROUTES_RESOLVED: &str = "routes_resolved_total";
/// Unknown route lookups counter metric name.
pub const METRIC_ROUTE_MISSES: &str = "route_misses_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_DISPATCH_LATENCY,
        "Request dispatch latency in milliseconds"
    );

    describe_counter!(METRIC_DISPATCHES, "Total number of requests dispatched");
    describe_counter!(
        METRIC_DISPATCH_SUCCESSES,
        "Total number of dispatches that completed with a 2xx status"
    );
    describe_counter!(
        METRIC_DISPATCH_FAILURES,
        "Total number of dispatches with a non-2xx status or transport failure"
    );
    describe_counter!(METRIC_ROUTES_RESOLVED, "Total number of routes resolved");
    describe_counter!(METRIC_ROUTE_MISSES, "Total number of unknown route lookups");

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder, then register descriptions on it.
///
/// Descriptions emitted before a recorder exists are dropped, so this is the
/// entry point for processes that export metrics.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record dispatch latency for a method.
pub fn record_dispatch_latency(start: Instant, method: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_DISPATCH_LATENCY, "method" => method.to_string()).record(latency_ms);
}

/// Increment dispatches counter.
pub fn inc_dispatches(method: &str) {
    counter!(METRIC_DISPATCHES, "method" => method.to_string()).increment(1);
}

/// Increment successful dispatches counter.
pub fn inc_dispatch_successes() {
    counter!(METRIC_DISPATCH_SUCCESSES).increment(1);
}

/// Increment failed dispatches counter.
pub fn inc_dispatch_failures() {
    counter!(METRIC_DISPATCH_FAILURES).increment(1);
}

/// Increment resolved routes counter.
pub fn inc_routes_resolved() {
    counter!(METRIC_ROUTES_RESOLVED).increment(1);
}

/// Increment unknown route counter.
pub fn inc_route_misses() {
    counter!(METRIC_ROUTE_MISSES).increment(1);
}

/// RAII guard for timing a dispatch.
/// Records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    method: &'static str,
}

impl LatencyTimer {
    /// Start timing a dispatch for the given method label.
    pub fn new(method: &'static str) -> Self {
        Self {
            start: Instant::now(),
            method,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_dispatch_latency(self.start, self.method);
    }
}
