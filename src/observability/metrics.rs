//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sidecar_proxy_requests_total` (counter): proxied requests by status, route source
//! - `sidecar_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `sidecar_routes_total` (counter): resolutions by source (directory/fallback)
//! - `sidecar_app_alive` (gauge): 1=local application answering, 0=not
//! - `sidecar_directory_retries_total` (counter): failed directory updates by operation
//! - `sidecar_state_transitions_total` (counter): lifecycle transitions by target state

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::RouteSource;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, source: &'static str, start: Instant) {
    counter!(
        "sidecar_proxy_requests_total",
        "status" => status.to_string(),
        "route" => source
    )
    .increment(1);
    histogram!("sidecar_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_route(source: RouteSource) {
    counter!("sidecar_routes_total", "source" => source.as_str()).increment(1);
}

pub fn record_liveness(alive: bool) {
    gauge!("sidecar_app_alive").set(if alive { 1.0 } else { 0.0 });
}

pub fn record_directory_retry(operation: &'static str) {
    counter!("sidecar_directory_retries_total", "operation" => operation).increment(1);
}

pub fn record_transition(to: &'static str) {
    counter!("sidecar_state_transitions_total", "to" => to).increment(1);
}
