//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_decisions_total` (counter): decisions by outcome
//! - `guard_request_duration_seconds` (histogram): end-to-end latency
//! - `guard_csrf_rejections_total` (counter)
//! - `guard_rate_limited_total` (counter)
//! - `guard_csrf_tokens_issued_total` (counter)
//!
//! Without an installed recorder every call here is a no-op, which keeps unit
//! tests free of global state.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one guard decision and the request latency.
pub fn record_decision(outcome: &'static str, status: u16, start: Instant) {
    counter!("guard_decisions_total", "outcome" => outcome, "status" => status.to_string())
        .increment(1);
    histogram!("guard_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());

    match outcome {
        "csrf_rejected" => counter!("guard_csrf_rejections_total").increment(1),
        "rate_limited" => counter!("guard_rate_limited_total").increment(1),
        _ => {}
    }
}

pub fn record_csrf_issued() {
    counter!("guard_csrf_tokens_issued_total").increment(1);
}
