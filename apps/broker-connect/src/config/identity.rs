//! Portal identity configuration.

use serde::{Deserialize, Serialize};

/// Identity provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Provisioned portal tokens.
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

/// One provisioned portal token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Opaque bearer token, normally injected via `${...}` interpolation.
    pub token: String,
    /// Portal user the token acts as.
    pub user_id: String,
    /// Restrict the token to read operations.
    #[serde(default)]
    pub read_only: bool,
}
