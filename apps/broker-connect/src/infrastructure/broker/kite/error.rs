//! Kite-specific error types.

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the Kite adapter.
#[derive(Debug, Error, Clone)]
pub enum KiteApiError {
    /// Adapter configuration is unusable.
    #[error("invalid broker configuration: {0}")]
    Config(String),

    /// Transport-level failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The broker answered 5xx without a decodable error envelope.
    #[error("broker upstream error: HTTP {status}")]
    Upstream {
        /// HTTP status code.
        status: u16,
    },

    /// The broker rejected the session token (`TokenException`).
    #[error("token rejected: {message}")]
    TokenRejected {
        /// Broker-reported reason.
        message: String,
    },

    /// The broker reported an application-level error.
    #[error("API error {error_type} (HTTP {status_code}): {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Kite error class, e.g. `InputException`.
        error_type: String,
        /// Broker-reported message.
        message: String,
    },

    /// The response body did not match the documented shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<KiteApiError> for BrokerError {
    fn from(err: KiteApiError) -> Self {
        match err {
            KiteApiError::TokenRejected { .. } => Self::Unauthorized,
            KiteApiError::Config(reason) | KiteApiError::Network(reason) => {
                Self::Unavailable { reason }
            }
            KiteApiError::Timeout => Self::Unavailable {
                reason: "request timed out".to_string(),
            },
            KiteApiError::Upstream { status } => Self::Unavailable {
                reason: format!("broker upstream error: HTTP {status}"),
            },
            KiteApiError::Api {
                error_type,
                message,
                ..
            } => Self::Protocol {
                message: format!("{error_type}: {message}"),
            },
            KiteApiError::Protocol(message) => Self::Protocol { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rejected_maps_to_unauthorized() {
        let err = KiteApiError::TokenRejected {
            message: "Incorrect `api_key` or `access_token`.".to_string(),
        };
        assert!(matches!(BrokerError::from(err), BrokerError::Unauthorized));
    }

    #[test]
    fn transport_failures_map_to_unavailable() {
        let err = KiteApiError::Network("connection refused".to_string());
        assert!(matches!(
            BrokerError::from(err),
            BrokerError::Unavailable { .. }
        ));

        assert!(matches!(
            BrokerError::from(KiteApiError::Timeout),
            BrokerError::Unavailable { .. }
        ));

        assert!(matches!(
            BrokerError::from(KiteApiError::Upstream { status: 503 }),
            BrokerError::Unavailable { .. }
        ));
    }

    #[test]
    fn api_errors_map_to_protocol() {
        let err = KiteApiError::Api {
            status_code: 400,
            error_type: "InputException".to_string(),
            message: "Missing field".to_string(),
        };
        let broker_err = BrokerError::from(err);
        match broker_err {
            BrokerError::Protocol { message } => {
                assert!(message.contains("InputException"));
                assert!(message.contains("Missing field"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn undecodable_body_maps_to_protocol() {
        let err = KiteApiError::Protocol("undecodable response".to_string());
        assert!(matches!(
            BrokerError::from(err),
            BrokerError::Protocol { .. }
        ));
    }
}
