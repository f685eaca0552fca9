//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (request counts, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `lister_requests_total` (counter): requests by lister, inbound status
//! - `lister_request_duration_seconds` (histogram): time until the inbound
//!   response head is ready (body streaming excluded)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and
//!   metrics-disabled deployments pay nothing

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the outcome of one listing request.
pub fn record_listing(lister: &str, status: u16, start_time: Instant) {
    let lister = lister.to_string();
    ::metrics::counter!(
        "lister_requests_total",
        "lister" => lister.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("lister_request_duration_seconds", "lister" => lister)
        .record(start_time.elapsed().as_secs_f64());
}
