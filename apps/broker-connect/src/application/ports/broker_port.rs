//! Broker Port (Driven Port)
//!
//! Interface to the brokerage's connect API: authorization URL construction,
//! request token exchange, and authenticated account reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::position::{BrokerProfile, MarginSummary, PositionBook};

/// Credentials for an authenticated broker call.
///
/// The broker authenticates data calls with the API key and the session's
/// access token together; neither alone is sufficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAuth {
    /// Application API key issued by the broker.
    pub api_key: String,
    /// Session access token from a completed token exchange.
    pub access_token: String,
}

impl BrokerAuth {
    /// Create broker call credentials.
    #[must_use]
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }
}

/// Result of a successful request token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSession {
    /// Access token for subsequent data calls. Valid until the broker's
    /// daily expiry; there is no refresh protocol.
    pub access_token: String,
    /// Broker's identifier for the account, when the exchange reports it.
    pub external_id: Option<String>,
    /// Account display name, when the exchange reports it.
    pub display_name: Option<String>,
}

/// Broker port error.
///
/// `Unauthorized` and `Unavailable` are deliberately distinct: only
/// `Unauthorized` means the session is dead and the user must re-authorize.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// The broker rejected a request token exchange. Request tokens are
    /// single-use, so this is never retried.
    #[error("token exchange failed: {reason}")]
    ExchangeFailed {
        /// Broker-reported reason.
        reason: String,
    },

    /// The broker rejected the access token. Terminal for the session.
    #[error("broker rejected the access token")]
    Unauthorized,

    /// Transport-level failure reaching the broker. Transient.
    #[error("broker unavailable: {reason}")]
    Unavailable {
        /// Transport error details.
        reason: String,
    },

    /// The broker responded with a shape this service does not understand.
    #[error("unexpected broker response: {message}")]
    Protocol {
        /// Parse error details.
        message: String,
    },
}

/// Port for broker connect interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Build the broker login URL for the hosted authorization flow.
    /// Deterministic, no network call.
    fn authorization_url(&self, api_key: &str, redirect_uri: &str) -> String;

    /// Exchange a one-time request token for an access token.
    ///
    /// Single round trip. Any non-success broker response maps to
    /// `ExchangeFailed`.
    async fn exchange_request_token(
        &self,
        api_key: &str,
        api_secret: &str,
        request_token: &str,
    ) -> Result<BrokerSession, BrokerError>;

    /// Fetch the account profile.
    async fn fetch_profile(&self, auth: &BrokerAuth) -> Result<BrokerProfile, BrokerError>;

    /// Fetch the equity margin summary.
    async fn fetch_margins(&self, auth: &BrokerAuth) -> Result<MarginSummary, BrokerError>;

    /// Fetch net and day position books.
    async fn fetch_positions(&self, auth: &BrokerAuth) -> Result<PositionBook, BrokerError>;
}
