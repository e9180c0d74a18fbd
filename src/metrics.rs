//! Prometheus metrics for gateway observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (`METRICS_PORT`, default 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gateway_upstream_requests_total` - Upstream calls (labels: endpoint, outcome)
//! - `gateway_image_relays_total` - Finished image relays (labels: outcome)
//! - `gateway_image_bytes_relayed_total` - Image bytes written to callers
//!
//! ## Histograms
//! - `gateway_upstream_duration_seconds` - Time until upstream headers arrived (labels: endpoint)
//!
//! # Usage
//!
//! ```rust,ignore
//! use moviehub_gateway::metrics::{init_metrics, record_upstream_request};
//!
//! init_metrics(addr)?;
//! record_upstream_request("image", "success");
//! ```
//!
//! Without an installed recorder every recording function is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const UPSTREAM_REQUESTS_TOTAL: &str = "gateway_upstream_requests_total";
    pub const UPSTREAM_DURATION_SECONDS: &str = "gateway_upstream_duration_seconds";
    pub const IMAGE_RELAYS_TOTAL: &str = "gateway_image_relays_total";
    pub const IMAGE_BYTES_RELAYED_TOTAL: &str = "gateway_image_bytes_relayed_total";
}

/// Initialize the Prometheus metrics exporter on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::UPSTREAM_REQUESTS_TOTAL,
        "Total number of requests issued to TMDB, by outcome"
    );
    describe_counter!(
        names::IMAGE_RELAYS_TOTAL,
        "Total number of image relays, by how they ended"
    );
    describe_counter!(
        names::IMAGE_BYTES_RELAYED_TOTAL,
        "Total image bytes relayed to callers"
    );
    describe_histogram!(
        names::UPSTREAM_DURATION_SECONDS,
        "Time until TMDB response headers arrived, in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record the outcome of one upstream call.
pub fn record_upstream_request(endpoint: &'static str, outcome: &'static str) {
    counter!(names::UPSTREAM_REQUESTS_TOTAL, "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
}

/// Record time until upstream headers arrived (or the wait was abandoned).
pub fn record_upstream_duration(endpoint: &'static str, duration_secs: f64) {
    histogram!(names::UPSTREAM_DURATION_SECONDS, "endpoint" => endpoint).record(duration_secs);
}

/// Record a finished image relay.
pub fn record_relay(outcome: &'static str, bytes: u64) {
    counter!(names::IMAGE_RELAYS_TOTAL, "outcome" => outcome).increment(1);
    counter!(names::IMAGE_BYTES_RELAYED_TOTAL).increment(bytes);
}
