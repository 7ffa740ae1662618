//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

/// Body for `POST /api/broker/configure`.
///
/// Fields default to empty strings so a missing key surfaces as
/// `invalid_input` from the use case instead of a deserialization reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    /// Broker API key.
    #[serde(default)]
    pub api_key: String,
    /// Broker API secret.
    #[serde(default)]
    pub api_secret: String,
}

/// Query parameters the broker appends to the authorization redirect.
///
/// Keys are snake_case on the wire; the broker controls them, not the
/// portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackParams {
    /// One-time request token, present on success.
    pub request_token: Option<String>,
    /// Authorization outcome, `success` or a failure marker.
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_request_defaults_missing_fields() {
        let req: ConfigureRequest = serde_json::from_str(r#"{"apiKey": "K1"}"#).unwrap();
        assert_eq!(req.api_key, "K1");
        assert_eq!(req.api_secret, "");
    }

    #[test]
    fn configure_request_uses_camel_case() {
        let req: ConfigureRequest =
            serde_json::from_str(r#"{"apiKey": "K1", "apiSecret": "S1"}"#).unwrap();
        assert_eq!(req.api_key, "K1");
        assert_eq!(req.api_secret, "S1");
    }

    #[test]
    fn callback_params_allow_missing_token() {
        let params: CallbackParams = serde_json::from_str(r#"{"status": "failure"}"#).unwrap();
        assert!(params.request_token.is_none());
        assert_eq!(params.status.as_deref(), Some("failure"));
    }
}
