//! Configuration module for the broker link service.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for every service component.
//!
//! # Usage
//!
//! ```rust,ignore
//! use broker_connect::config::load_config;
//!
//! // Load from the default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from a custom path
//! let config = load_config(Some("deploy/config.yaml"))?;
//! ```

mod broker;
mod identity;
mod observability;
mod persistence;
mod portal;
mod sealing;
mod server;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use broker::BrokerConfig;
pub use identity::{IdentityConfig, TokenEntry};
pub use observability::ObservabilityConfig;
pub use persistence::PersistenceConfig;
pub use portal::PortalConfig;
pub use sealing::SealingConfig;
pub use server::ServerConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Broker API configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Hosting portal URLs.
    #[serde(default)]
    pub portal: PortalConfig,
    /// At-rest secret sealing configuration.
    #[serde(default)]
    pub sealing: SealingConfig,
    /// Credential store configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Portal identity configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Logging and metrics configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// With no explicit path, a missing `config.yaml` falls back to defaults;
/// an explicitly given path must exist.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let resolved = path.unwrap_or(DEFAULT_CONFIG_PATH);

    if path.is_none() && !Path::new(resolved).exists() {
        tracing::warn!(path = resolved, "config file not found, using defaults");
        let config = Config::default();
        validate_config(&config)?;
        return Ok(config);
    }

    let contents = std::fs::read_to_string(resolved).map_err(|e| ConfigError::ReadError {
        path: resolved.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. An unset variable
/// without a default becomes an empty string.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str());
        match std::env::var(&caps[1]) {
            Ok(value) if !value.is_empty() => value,
            _ => default_value.unwrap_or_default().to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    match config.persistence.backend.as_str() {
        "turso" | "memory" => {}
        other => {
            return Err(ConfigError::ValidationError(format!(
                "persistence.backend must be 'turso' or 'memory', got '{other}'"
            )));
        }
    }

    // A durable store with an ephemeral key could never open its own rows
    // after a restart.
    if config.persistence.is_durable() && config.sealing.is_ephemeral() {
        return Err(ConfigError::ValidationError(
            "persistence.backend 'turso' requires sealing.master_key".to_string(),
        ));
    }

    for (name, url) in [
        ("portal.redirect_uri", &config.portal.redirect_uri),
        ("portal.success_url", &config.portal.success_url),
        ("portal.error_url", &config.portal.error_url),
        ("broker.api_base", &config.broker.api_base),
        ("broker.login_base", &config.broker.login_base),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be an absolute http(s) URL"
            )));
        }
    }

    if config.broker.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "broker.timeout_ms must be positive".to_string(),
        ));
    }

    let metrics_addr: std::net::SocketAddr =
        config.observability.metrics_addr.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "observability.metrics_addr '{}' is not a socket address",
                config.observability.metrics_addr
            ))
        })?;
    if metrics_addr.port() == config.server.http_port {
        return Err(ConfigError::ValidationError(
            "observability.metrics_addr port must differ from server.http_port".to_string(),
        ));
    }

    for entry in &config.identity.tokens {
        if entry.token.trim().is_empty() || entry.user_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "identity.tokens entries need a token and a user_id".to_string(),
            ));
        }
    }

    Ok(())
}
