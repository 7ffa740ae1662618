//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with console output.
///
/// Reads the filter from `RUST_LOG` when set, falling back to
/// `default_directive` otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init_tracing(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
