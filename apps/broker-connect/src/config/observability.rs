//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Listen address for the Prometheus metrics exporter.
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
    /// Tracing directive applied when `RUST_LOG` is unset.
    #[serde(default = "default_log_directive")]
    pub log_directive: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_addr: default_metrics_addr(),
            log_directive: default_log_directive(),
        }
    }
}

pub(crate) fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

pub(crate) fn default_log_directive() -> String {
    "broker_connect=info".to_string()
}
