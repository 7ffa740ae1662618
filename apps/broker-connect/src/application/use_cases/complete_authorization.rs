//! Complete Authorization Use Case
//!
//! Handles the broker's redirect back to the portal. The redirect carries a
//! one-time request token which is exchanged for an access token in a
//! single round trip; the outcome decides which page the user lands on.

use std::sync::Arc;

use chrono::Utc;

use crate::application::ports::{BrokerPort, CredentialStore, PortalUser};
use crate::domain::credential::CredentialPatch;
use crate::domain::link_state::{LinkState, LinkStateMachine};
use crate::error::ServiceError;
use crate::observability::metrics;

/// Where the broker redirect ends up. Everything except `Success` maps to
/// an error code in the redirect query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Access token stored; send the user to the success page.
    Success,
    /// The broker reported a failed or cancelled authorization.
    OauthFailed,
    /// No portal session, or a session that may not act on this link.
    NoSession,
    /// The user never configured an API key pair.
    NoApiKey,
    /// The broker rejected the request token exchange.
    ExchangeFailed,
}

impl CallbackOutcome {
    /// Error code for the redirect query string, `None` on success.
    #[must_use]
    pub const fn error_code(self) -> Option<&'static str> {
        match self {
            Self::Success => None,
            Self::OauthFailed => Some("oauth_failed"),
            Self::NoSession => Some("no_session"),
            Self::NoApiKey => Some("no_api_key"),
            Self::ExchangeFailed => Some("token_exchange_failed"),
        }
    }
}

/// Use case for completing the broker authorization redirect.
pub struct CompleteAuthorization<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    store: Arc<S>,
    broker: Arc<B>,
}

impl<S, B> CompleteAuthorization<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    /// Create a new `CompleteAuthorization` use case.
    pub const fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self { store, broker }
    }

    /// Exchange the redirect's request token and store the session.
    ///
    /// Broker-side failures come back as a `CallbackOutcome` so the caller
    /// can redirect; only storage failures are hard errors, because losing
    /// an exchanged token cannot be papered over with a retry page.
    pub async fn execute(
        &self,
        user: Option<&PortalUser>,
        request_token: Option<&str>,
        status: Option<&str>,
    ) -> Result<CallbackOutcome, ServiceError> {
        // 1. The broker reports the authorization outcome in the redirect.
        let token = request_token.map(str::trim).unwrap_or_default();
        if status != Some("success") || token.is_empty() {
            tracing::info!(status = status.unwrap_or("<missing>"), "broker redirect without success");
            return Ok(CallbackOutcome::OauthFailed);
        }

        // 2. A redirect without a mutating portal session cannot complete
        //    the flow; the request token dies unused.
        let Some(user) = user else {
            return Ok(CallbackOutcome::NoSession);
        };
        if !user.scope.can_mutate() {
            return Ok(CallbackOutcome::NoSession);
        }

        // 3. The stored key pair signs the exchange.
        let record = self.store.get(&user.user_id).await?;
        if LinkStateMachine::validate_transition(record.state(), LinkState::AwaitingAuthorization)
            .is_err()
        {
            return Ok(CallbackOutcome::NoApiKey);
        }
        let (Some(api_key), Some(api_secret)) =
            (record.api_key.as_deref(), record.api_secret.as_deref())
        else {
            return Ok(CallbackOutcome::NoApiKey);
        };

        // 4. Single exchange attempt. Request tokens are one-shot, so any
        //    failure here is final for this redirect.
        let session = match self
            .broker
            .exchange_request_token(api_key, api_secret, token)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, error = %e, "request token exchange failed");
                metrics::record_link_transition(
                    LinkState::AwaitingAuthorization,
                    LinkState::Disconnected,
                );
                return Ok(CallbackOutcome::ExchangeFailed);
            }
        };

        // 5. One atomic write stores the sealed token and sync time.
        let updated = self
            .store
            .set(
                &user.user_id,
                CredentialPatch::authorized(session.access_token, Utc::now()),
            )
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.user_id, error = %e, "exchange succeeded but session could not be stored");
                ServiceError::from(e)
            })?;

        metrics::record_link_transition(LinkState::AwaitingAuthorization, LinkState::Authorized);
        tracing::info!(user_id = %user.user_id, state = %updated.state(), "broker session authorized");

        Ok(CallbackOutcome::Success)
    }
}
