//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): scanned requests by verdict
//! - `shield_requests_blocked_total` (counter): rejected requests by threat
//! - `shield_statements_blocked_total` (counter): rejected raw statements by reason

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(verdict: &'static str) {
    metrics::counter!("shield_requests_total", "verdict" => verdict).increment(1);
}

pub fn record_request_blocked(threat: &'static str) {
    metrics::counter!("shield_requests_blocked_total", "threat" => threat).increment(1);
}

pub fn record_statement_blocked(reason: &'static str) {
    metrics::counter!("shield_statements_blocked_total", "reason" => reason).increment(1);
}
