//! Metrics collection and exposition.
//!
//! # Metrics
//! - `imai_requests_total` (counter): inbound API requests by route, status
//! - `imai_request_duration_seconds` (histogram): inbound latency by route
//! - `imai_upstream_requests_total` (counter): provider calls by provider, outcome
//! - `imai_upstream_duration_seconds` (histogram): provider latency
//! - `imai_rate_limited_total` (counter): over-budget checks by key
//! - `imai_queue_pending` / `imai_queue_running` (gauges): queue depth by queue
//! - `imai_queue_retries_total` (counter): backoff retries by queue
//! - `imai_queue_timeouts_total` (counter): jobs expired at dequeue by queue

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: String, status: u16, start: Instant) {
    counter!("imai_requests_total", "route" => route.clone(), "status" => status.to_string())
        .increment(1);
    histogram!("imai_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream(provider: &'static str, outcome: &'static str, start: Instant) {
    counter!("imai_upstream_requests_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
    histogram!("imai_upstream_duration_seconds", "provider" => provider)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(key: &str) {
    counter!("imai_rate_limited_total", "key" => key.to_string()).increment(1);
}

pub fn record_queue_depth(queue: &'static str, pending: usize, running: usize) {
    gauge!("imai_queue_pending", "queue" => queue).set(pending as f64);
    gauge!("imai_queue_running", "queue" => queue).set(running as f64);
}

pub fn record_queue_retry(queue: &'static str) {
    counter!("imai_queue_retries_total", "queue" => queue).increment(1);
}

pub fn record_queue_timeout(queue: &'static str) {
    counter!("imai_queue_timeouts_total", "queue" => queue).increment(1);
}
