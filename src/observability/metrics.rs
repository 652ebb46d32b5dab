//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_reloads_total` (counter): reload attempts by outcome
//! - `server_sink_reopen_failures_total` (counter): failed sink reopens by sink
//! - `server_active_connections` (gauge): in-flight units of work
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_reload(outcome: &'static str) {
    ::metrics::counter!("server_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_sink_failure(sink: &str) {
    ::metrics::counter!("server_sink_reopen_failures_total", "sink" => sink.to_string())
        .increment(1);
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("server_active_connections").set(count as f64);
}
