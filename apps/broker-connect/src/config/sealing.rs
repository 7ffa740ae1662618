//! Secret sealing configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the at-rest secret codec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SealingConfig {
    /// Base64-encoded 256-bit master key, normally injected via
    /// `${BROKER_MASTER_KEY}`. Empty selects an ephemeral per-process key,
    /// which only works with the in-memory store.
    #[serde(default)]
    pub master_key: String,
}

impl SealingConfig {
    /// True when no durable master key is configured.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.master_key.trim().is_empty()
    }
}
