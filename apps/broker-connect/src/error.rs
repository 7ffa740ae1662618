//! Rich error handling for the broker connect service.
//!
//! This module provides the service-level error taxonomy shared by every
//! operation. Errors carry a stable wire code and a human-readable message;
//! the HTTP layer turns them into structured JSON bodies.
//!
//! # HTTP Status Codes
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `unauthenticated` | 401 | No portal identity on the request |
//! | `forbidden` | 403 | Identity present but not allowed to mutate |
//! | `invalid_input` | 400 | Malformed or missing request fields |
//! | `not_configured` | 400 | No API key stored yet (`needsCredentials`) |
//! | `not_authorized` | 400 | No access token yet (`needsAuth`) |
//! | `token_exchange_failed` | 400 | Broker rejected the request token |
//! | `broker_unauthorized` | 400 | Broker rejected the stored session |
//! | `broker_unavailable` | 400 | Broker transport failure, retryable |
//! | `storage_unavailable` | 500 | Credential store failure |
//! | `broker_protocol` | 500 | Broker response shape not understood |

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{BrokerError, StoreError};
use crate::domain::link_state::{InvalidTransition, LinkState};

/// Error codes for the broker connect service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Identity errors
    /// No portal identity on the request.
    Unauthenticated,
    /// Identity present but the operation is not allowed for it.
    Forbidden,

    // Request errors
    /// Malformed request or missing fields.
    InvalidInput,
    /// Operation requires stored credentials and none exist.
    NotConfigured,
    /// Operation requires an access token and none exists.
    NotAuthorized,

    // Broker errors
    /// Broker rejected the one-time request token.
    TokenExchangeFailed,
    /// Broker rejected the stored access token.
    BrokerUnauthorized,
    /// Broker could not be reached.
    BrokerUnavailable,
    /// Broker responded with an unexpected shape.
    BrokerProtocol,

    // Storage errors
    /// Credential store failure.
    StorageUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status for this error.
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidInput
            | Self::NotConfigured
            | Self::NotAuthorized
            | Self::TokenExchangeFailed
            | Self::BrokerUnauthorized
            | Self::BrokerUnavailable => StatusCode::BAD_REQUEST,
            Self::BrokerProtocol | Self::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable wire code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::InvalidInput => "invalid_input",
            Self::NotConfigured => "not_configured",
            Self::NotAuthorized => "not_authorized",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::BrokerUnauthorized => "broker_unauthorized",
            Self::BrokerUnavailable => "broker_unavailable",
            Self::BrokerProtocol => "broker_protocol",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }

    /// True when the client should prompt for API credentials.
    #[must_use]
    pub const fn needs_credentials(self) -> bool {
        matches!(self, Self::NotConfigured)
    }

    /// True when the client should route the user through broker login.
    #[must_use]
    pub const fn needs_auth(self) -> bool {
        matches!(self, Self::NotAuthorized)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A service error with a wire code and message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
}

impl ServiceError {
    /// Create a new service error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

/// Convenience constructors for common errors.
impl ServiceError {
    /// No portal identity on the request.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthenticated, "portal authentication required")
    }

    /// Identity present but not allowed to perform the operation.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Malformed request or missing fields.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Operation requires stored credentials and none exist.
    #[must_use]
    pub fn not_configured() -> Self {
        Self::new(
            ErrorCode::NotConfigured,
            "broker API credentials are not configured",
        )
    }

    /// Operation requires an access token and none exists.
    #[must_use]
    pub fn not_authorized() -> Self {
        Self::new(
            ErrorCode::NotAuthorized,
            "broker session is not authorized",
        )
    }

    /// Broker rejected the one-time request token.
    #[must_use]
    pub fn exchange_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenExchangeFailed, reason)
    }

    /// Credential store failure.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageUnavailable, message)
    }

    /// Map a rejected lifecycle transition to the remediation the client
    /// should offer. A record without credentials needs configuration; a
    /// record without a session needs authorization.
    #[must_use]
    pub fn from_transition(err: &InvalidTransition) -> Self {
        match err.from {
            LinkState::Unconfigured | LinkState::Disconnected => Self::not_configured(),
            LinkState::Configured => Self::not_authorized(),
            _ => Self::invalid_input(err.reason.clone()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            // Every portal user is enrolled at startup, so a missing record
            // indicates store drift rather than client error.
            StoreError::NotFound { user_id } => Self::new(
                ErrorCode::StorageUnavailable,
                format!("no credential record for user {user_id}"),
            ),
            StoreError::Unavailable { message } | StoreError::Codec { message } => {
                Self::new(ErrorCode::StorageUnavailable, message)
            }
        }
    }
}

/// Mapping for broker failures during data calls. Token exchange has its
/// own mapping in the authorization flow, where every failure becomes
/// `token_exchange_failed`.
impl From<BrokerError> for ServiceError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::ExchangeFailed { reason } => Self::exchange_failed(reason),
            BrokerError::Unauthorized => Self::new(
                ErrorCode::BrokerUnauthorized,
                "broker rejected the stored session",
            ),
            BrokerError::Unavailable { reason } => Self::new(ErrorCode::BrokerUnavailable, reason),
            BrokerError::Protocol { message } => Self::new(ErrorCode::BrokerProtocol, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(
            ErrorCode::Unauthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::Forbidden.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::NotConfigured.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::BrokerUnavailable.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::StorageUnavailable.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::BrokerProtocol.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_hint_flags_follow_code() {
        assert!(ErrorCode::NotConfigured.needs_credentials());
        assert!(!ErrorCode::NotConfigured.needs_auth());
        assert!(ErrorCode::NotAuthorized.needs_auth());
        assert!(!ErrorCode::NotAuthorized.needs_credentials());
        assert!(!ErrorCode::BrokerUnauthorized.needs_auth());
    }

    #[test]
    fn test_error_display() {
        let error = ServiceError::invalid_input("apiKey is required");
        assert_eq!(error.to_string(), "[invalid_input] apiKey is required");
    }

    #[test]
    fn test_broker_error_mapping() {
        let err: ServiceError = BrokerError::Unauthorized.into();
        assert_eq!(err.code(), ErrorCode::BrokerUnauthorized);

        let err: ServiceError = BrokerError::Unavailable {
            reason: "connect timeout".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::BrokerUnavailable);

        let err: ServiceError = BrokerError::Protocol {
            message: "missing data envelope".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::BrokerProtocol);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ServiceError = StoreError::Unavailable {
            message: "disk full".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::StorageUnavailable);
        assert_eq!(err.code().http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transition_mapping_picks_remediation() {
        let err = InvalidTransition {
            from: LinkState::Unconfigured,
            to: LinkState::AwaitingAuthorization,
            reason: "no credentials stored".to_string(),
        };
        assert_eq!(
            ServiceError::from_transition(&err).code(),
            ErrorCode::NotConfigured
        );

        let err = InvalidTransition {
            from: LinkState::Configured,
            to: LinkState::Connected,
            reason: "no access token stored".to_string(),
        };
        assert_eq!(
            ServiceError::from_transition(&err).code(),
            ErrorCode::NotAuthorized
        );
    }
}
