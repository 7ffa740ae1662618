//! Broker API configuration.

use serde::{Deserialize, Serialize};

/// Kite Connect endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Base URL of the broker REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base URL of the hosted login flow.
    #[serde(default = "default_login_base")]
    pub login_base: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            login_base: default_login_base(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

pub(crate) fn default_api_base() -> String {
    "https://api.kite.trade".to_string()
}

pub(crate) fn default_login_base() -> String {
    "https://kite.zerodha.com".to_string()
}

pub(crate) const fn default_timeout_ms() -> u64 {
    10_000
}
