//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by route, method, status
//! - `relay_request_duration_seconds` (histogram): time to response head
//! - `relay_upstream_errors_total` (counter): relay failures by phase

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::proxy::RelayPhase;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "relay_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    ::metrics::histogram!("relay_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failed relay attempt.
pub fn record_upstream_error(phase: RelayPhase) {
    ::metrics::counter!("relay_upstream_errors_total", "phase" => phase.to_string()).increment(1);
}
