//! Hosting portal URLs used by the authorization flow.

use serde::{Deserialize, Serialize};

/// Portal URL configuration.
///
/// `redirect_uri` must match the redirect registered with the broker for
/// the configured API keys, or the hosted login flow refuses to redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Callback URL the broker redirects to after authorization.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Portal page shown after a successful authorization.
    #[serde(default = "default_success_url")]
    pub success_url: String,
    /// Portal page shown on a failed authorization.
    #[serde(default = "default_error_url")]
    pub error_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            redirect_uri: default_redirect_uri(),
            success_url: default_success_url(),
            error_url: default_error_url(),
        }
    }
}

pub(crate) fn default_redirect_uri() -> String {
    "http://localhost:8080/api/broker/callback".to_string()
}

pub(crate) fn default_success_url() -> String {
    "http://localhost:3000/settings/broker".to_string()
}

pub(crate) fn default_error_url() -> String {
    "http://localhost:3000/settings/broker/error".to_string()
}
