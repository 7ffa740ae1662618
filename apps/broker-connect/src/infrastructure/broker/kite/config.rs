//! Kite adapter configuration.

use std::time::Duration;

/// Configuration for the Kite Connect adapter.
///
/// API keys and secrets are per-user state, not adapter configuration; they
/// arrive with each call.
#[derive(Debug, Clone)]
pub struct KiteConfig {
    /// Base URL of the REST API.
    pub api_base: String,
    /// Base URL of the hosted login flow.
    pub login_base: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for KiteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.kite.trade".to_string(),
            login_base: "https://kite.zerodha.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl KiteConfig {
    /// Create a configuration with explicit base URLs.
    #[must_use]
    pub fn new(api_base: impl Into<String>, login_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            login_base: login_base.into(),
            ..Self::default()
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
