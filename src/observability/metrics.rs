//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, upstream failures, tunnels)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `cdp_proxy_requests_total` (counter): relayed requests by method, status
//! - `cdp_proxy_request_duration_seconds` (histogram): relay latency
//! - `cdp_proxy_upstream_failures_total` (counter): failures by reason
//! - `cdp_proxy_discovery_rewrites_total` (counter): rewrite outcomes
//! - `cdp_proxy_tunnels_active` (gauge): live tunnels
//! - `cdp_proxy_tunnels_total` (counter): finished tunnels by first exit reason
//! - `cdp_proxy_frames_forwarded_total` (counter): frames by direction
//! - `cdp_proxy_tunnel_close_timeouts_total` (counter): teardown timeouts by side
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels are low-cardinality (no paths, no target ids)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "cdp_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("cdp_proxy_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(reason: &'static str) {
    metrics::counter!("cdp_proxy_upstream_failures_total", "reason" => reason).increment(1);
}

pub fn record_rewrite(outcome: &'static str) {
    metrics::counter!("cdp_proxy_discovery_rewrites_total", "outcome" => outcome).increment(1);
}

pub fn set_tunnels_active(count: u64) {
    metrics::gauge!("cdp_proxy_tunnels_active").set(count as f64);
}

pub fn tunnel_closed(first_exit: &'static str) {
    metrics::counter!("cdp_proxy_tunnels_total", "outcome" => first_exit).increment(1);
}

pub fn record_frames(direction: &'static str, count: u64) {
    metrics::counter!("cdp_proxy_frames_forwarded_total", "direction" => direction)
        .increment(count);
}

pub fn record_close_timeout(side: &'static str) {
    metrics::counter!("cdp_proxy_tunnel_close_timeouts_total", "side" => side).increment(1);
}
