//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): dispatched requests by method, status
//! - `switchyard_request_duration_seconds` (histogram): dispatch latency
//! - `switchyard_unhandled_errors_total` (counter): errors no handler took, by kind
//! - `switchyard_swallowed_errors_total` (counter): filter failures ignored, by stage

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("switchyard_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_unhandled(kind: &'static str) {
    metrics::counter!("switchyard_unhandled_errors_total", "kind" => kind).increment(1);
}

pub fn record_swallowed(stage: &'static str) {
    metrics::counter!("switchyard_swallowed_errors_total", "stage" => stage).increment(1);
}
