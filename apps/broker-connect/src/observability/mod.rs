//! Observability module for metrics and logging.
//!
//! Provides Prometheus metrics export and tracing subscriber setup for the
//! broker link service.

pub mod metrics;
mod tracing;

pub use metrics::{init_metrics, MetricsConfig, MetricsError};
pub use tracing::init_tracing;
