//! Prometheus metrics for the broker link service.
//!
//! # Example
//!
//! ```ignore
//! use broker_connect::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default()).expect("Failed to initialize metrics");
//! ```

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::domain::link_state::LinkState;

/// Configuration for the Prometheus metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener to.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for broker round-trip latency, in seconds.
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().expect("valid default address"),
            // Broker round trips land between tens of milliseconds and the
            // request timeout.
            latency_buckets: vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        }
    }
}

impl MetricsConfig {
    /// Create a config with a custom listen address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter configuration was rejected.
    #[error("Failed to configure metrics exporter: {0}")]
    Configuration(String),

    /// Exporter could not be installed as the global recorder.
    #[error("Failed to install metrics exporter: {0}")]
    Installation(String),
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP listener on the configured address serving metrics in
/// Prometheus text format at `/metrics`.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Metrics exporter listening");

    Ok(())
}

/// Record a broker link state transition.
pub fn record_link_transition(from: LinkState, to: LinkState) {
    counter!(
        "link_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record one REST round trip to the broker API.
pub fn record_broker_request(endpoint: &str, outcome: &str, duration_seconds: f64) {
    counter!(
        "broker_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "broker_request_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(duration_seconds);
}

/// Record an error response returned to the portal.
pub fn record_route_error(code: &str) {
    counter!(
        "route_errors_total",
        "code" => code.to_string()
    )
    .increment(1);
}
