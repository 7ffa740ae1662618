//! Credential store configuration.

use serde::{Deserialize, Serialize};

/// Credential store configuration.
///
/// The default backend is `memory` so a bare checkout runs without a
/// sealing key; durable deployments select `turso` and provide one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Store backend, `turso` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database path for the turso backend.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
        }
    }
}

impl PersistenceConfig {
    /// True when the durable turso backend is selected.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.backend == "turso"
    }
}

pub(crate) fn default_backend() -> String {
    "memory".to_string()
}

pub(crate) fn default_db_path() -> String {
    "./data/broker.db".to_string()
}
