//! Verify Connection Use Case
//!
//! Live validation of a stored session: fetch the profile and margins, and
//! promote the link to `Connected` with a fresh balance. An `Unauthorized`
//! answer from the broker is terminal and tears the link down, because the
//! protocol has no token refresh.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::application::ports::{BrokerAuth, BrokerError, BrokerPort, CredentialStore, PortalUser};
use crate::domain::credential::CredentialPatch;
use crate::domain::link_state::{LinkState, LinkStateMachine};
use crate::domain::position::BrokerProfile;
use crate::error::ServiceError;
use crate::observability::metrics;

/// Result of a successful connection test.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    /// Broker-side account identity.
    pub profile: BrokerProfile,
    /// Equity cash balance as stored after the validation.
    pub balance: Decimal,
}

/// Use case for validating a stored broker session.
pub struct VerifyConnection<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    store: Arc<S>,
    broker: Arc<B>,
}

impl<S, B> VerifyConnection<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    /// Create a new `VerifyConnection` use case.
    pub const fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self { store, broker }
    }

    /// Validate the session against the live broker.
    pub async fn execute(&self, user: &PortalUser) -> Result<ConnectionReport, ServiceError> {
        if !user.scope.can_mutate() {
            return Err(ServiceError::forbidden(
                "read-only access cannot run a connection test",
            ));
        }

        let record = self.store.get(&user.user_id).await?;
        let from = record.state();

        LinkStateMachine::validate_transition(from, LinkState::Connected)
            .map_err(|e| ServiceError::from_transition(&e))?;

        let (Some(api_key), Some(access_token)) =
            (record.api_key.as_deref(), record.access_token.as_deref())
        else {
            return Err(ServiceError::not_authorized());
        };
        let auth = BrokerAuth::new(api_key, access_token);

        // 1. Profile proves the token is alive.
        let profile = match self.broker.fetch_profile(&auth).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.broker_failure(user, from, e).await),
        };

        // 2. Margins supply the equity cash balance.
        let margins = match self.broker.fetch_margins(&auth).await {
            Ok(margins) => margins,
            Err(e) => return Err(self.broker_failure(user, from, e).await),
        };

        // 3. Promote to Connected in one write.
        let updated = self
            .store
            .set(
                &user.user_id,
                CredentialPatch::connected(margins.available_cash, Utc::now()),
            )
            .await?;

        metrics::record_link_transition(from, LinkState::Connected);
        tracing::info!(user_id = %user.user_id, %from, "broker connection verified");

        Ok(ConnectionReport {
            profile,
            balance: updated.balance,
        })
    }

    /// A rejected token forces the link down before the error surfaces, so
    /// the user is never left believing they are connected. Transport
    /// failures mutate nothing.
    async fn broker_failure(
        &self,
        user: &PortalUser,
        from: LinkState,
        err: BrokerError,
    ) -> ServiceError {
        if matches!(err, BrokerError::Unauthorized) {
            if let Err(clear_err) = self.store.clear(&user.user_id).await {
                tracing::error!(user_id = %user.user_id, error = %clear_err, "failed to tear down rejected session");
                return ServiceError::from(clear_err);
            }
            metrics::record_link_transition(from, LinkState::Disconnected);
            tracing::warn!(user_id = %user.user_id, "broker rejected stored session; link disconnected");
        }
        ServiceError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::BrokerSession;
    use crate::domain::credential::UserId;
    use crate::domain::position::{MarginSummary, PositionBook};
    use crate::error::ErrorCode;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use crate::infrastructure::sealing::SecretCodec;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct AccountBroker {
        profile: Result<BrokerProfile, BrokerError>,
        margins: Result<MarginSummary, BrokerError>,
    }

    impl AccountBroker {
        fn healthy() -> Self {
            Self {
                profile: Ok(BrokerProfile {
                    display_name: "Test Trader".to_string(),
                    external_id: "ZX1234".to_string(),
                    broker_name: "Kite".to_string(),
                }),
                margins: Ok(MarginSummary {
                    available_cash: dec!(5000),
                    utilised: dec!(250),
                    net: dec!(5250),
                }),
            }
        }
    }

    #[async_trait]
    impl BrokerPort for AccountBroker {
        fn authorization_url(&self, api_key: &str, _redirect_uri: &str) -> String {
            format!("https://broker.test/login?api_key={api_key}")
        }

        async fn exchange_request_token(
            &self,
            _api_key: &str,
            _api_secret: &str,
            _request_token: &str,
        ) -> Result<BrokerSession, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_profile(&self, _auth: &BrokerAuth) -> Result<BrokerProfile, BrokerError> {
            self.profile.clone()
        }

        async fn fetch_margins(&self, _auth: &BrokerAuth) -> Result<MarginSummary, BrokerError> {
            self.margins.clone()
        }

        async fn fetch_positions(&self, _auth: &BrokerAuth) -> Result<PositionBook, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }
    }

    async fn authorized_store(user_id: &UserId) -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(user_id).await.unwrap();
        store
            .set(user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();
        store
            .set(user_id, CredentialPatch::authorized("T1", Utc::now()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn verify_promotes_to_connected() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let use_case = VerifyConnection::new(store.clone(), Arc::new(AccountBroker::healthy()));

        let report = use_case.execute(&user).await.unwrap();

        assert_eq!(report.balance, dec!(5000));
        assert_eq!(report.profile.external_id, "ZX1234");

        let record = store.get(&user.user_id).await.unwrap();
        assert_eq!(record.state(), LinkState::Connected);
        assert_eq!(record.balance, dec!(5000));
        assert!(record.invariant_holds());
    }

    #[tokio::test]
    async fn verify_without_token_needs_auth() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(&user.user_id).await.unwrap();
        store
            .set(&user.user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();

        let use_case = VerifyConnection::new(store, Arc::new(AccountBroker::healthy()));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAuthorized);
        assert!(err.code().needs_auth());
    }

    #[tokio::test]
    async fn verify_unconfigured_needs_credentials() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(&user.user_id).await.unwrap();

        let use_case = VerifyConnection::new(store, Arc::new(AccountBroker::healthy()));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotConfigured);
        assert!(err.code().needs_credentials());
    }

    #[tokio::test]
    async fn unauthorized_tears_the_link_down() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let broker = AccountBroker {
            profile: Err(BrokerError::Unauthorized),
            margins: AccountBroker::healthy().margins,
        };

        let use_case = VerifyConnection::new(store.clone(), Arc::new(broker));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerUnauthorized);

        let record = store.get(&user.user_id).await.unwrap();
        assert_eq!(record.state(), LinkState::Unconfigured);
        assert!(record.api_key.is_none());
        assert!(record.access_token.is_none());
        assert!(!record.is_connected);
        assert_eq!(record.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn transport_failure_leaves_state_unchanged() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let broker = AccountBroker {
            profile: AccountBroker::healthy().profile,
            margins: Err(BrokerError::Unavailable {
                reason: "connect timeout".to_string(),
            }),
        };

        let use_case = VerifyConnection::new(store.clone(), Arc::new(broker));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BrokerUnavailable);

        let record = store.get(&user.user_id).await.unwrap();
        assert_eq!(record.state(), LinkState::Authorized);
        assert_eq!(record.access_token.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn read_only_scope_is_forbidden() {
        let user = PortalUser::read_only(UserId::new("u-1"));
        let store = authorized_store(&user.user_id).await;
        let use_case = VerifyConnection::new(store, Arc::new(AccountBroker::healthy()));

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
