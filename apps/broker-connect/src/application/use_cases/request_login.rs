//! Request Login Use Case

use std::sync::Arc;

use crate::application::ports::{BrokerPort, CredentialStore, PortalUser};
use crate::domain::link_state::{LinkState, LinkStateMachine};
use crate::error::ServiceError;
use crate::observability::metrics;

/// Use case for issuing the broker's hosted login URL.
///
/// No state is written: the awaiting-authorization phase lives only in the
/// redirect round trip, never in the store.
pub struct RequestLogin<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    store: Arc<S>,
    broker: Arc<B>,
    redirect_uri: String,
}

impl<S, B> RequestLogin<S, B>
where
    S: CredentialStore,
    B: BrokerPort,
{
    /// Create a new `RequestLogin` use case.
    pub const fn new(store: Arc<S>, broker: Arc<B>, redirect_uri: String) -> Self {
        Self {
            store,
            broker,
            redirect_uri,
        }
    }

    /// Build the login URL for the user's stored API key.
    pub async fn execute(&self, user: &PortalUser) -> Result<String, ServiceError> {
        if !user.scope.can_mutate() {
            return Err(ServiceError::forbidden(
                "read-only access cannot start broker authorization",
            ));
        }

        let record = self.store.get(&user.user_id).await?;
        let from = record.state();

        LinkStateMachine::validate_transition(from, LinkState::AwaitingAuthorization)
            .map_err(|e| ServiceError::from_transition(&e))?;

        let Some(api_key) = record.api_key.as_deref() else {
            return Err(ServiceError::not_configured());
        };

        let url = self.broker.authorization_url(api_key, &self.redirect_uri);

        metrics::record_link_transition(from, LinkState::AwaitingAuthorization);
        tracing::info!(user_id = %user.user_id, "broker login link issued");

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BrokerAuth, BrokerError, BrokerSession};
    use crate::domain::credential::{CredentialPatch, UserId};
    use crate::domain::position::{BrokerProfile, MarginSummary, PositionBook};
    use crate::error::ErrorCode;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use crate::infrastructure::sealing::SecretCodec;
    use async_trait::async_trait;

    struct UrlOnlyBroker;

    #[async_trait]
    impl BrokerPort for UrlOnlyBroker {
        fn authorization_url(&self, api_key: &str, redirect_uri: &str) -> String {
            format!("https://broker.test/connect/login?v=3&api_key={api_key}&redirect_uri={redirect_uri}")
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
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_margins(&self, _auth: &BrokerAuth) -> Result<MarginSummary, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }

        async fn fetch_positions(&self, _auth: &BrokerAuth) -> Result<PositionBook, BrokerError> {
            Err(BrokerError::Protocol {
                message: "not used".to_string(),
            })
        }
    }

    async fn store_with_user(user_id: &UserId) -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(user_id).await.unwrap();
        store
    }

    #[tokio::test]
    async fn login_url_carries_stored_key() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;
        store
            .set(&user.user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();

        let use_case = RequestLogin::new(
            store,
            Arc::new(UrlOnlyBroker),
            "https://portal.test/api/broker/callback".to_string(),
        );

        let url = use_case.execute(&user).await.unwrap();
        assert!(url.contains("api_key=K1"));
        assert!(url.contains("portal.test"));
    }

    #[tokio::test]
    async fn unconfigured_user_needs_credentials() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;

        let use_case = RequestLogin::new(
            store,
            Arc::new(UrlOnlyBroker),
            "https://portal.test/api/broker/callback".to_string(),
        );

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotConfigured);
        assert!(err.code().needs_credentials());
    }

    #[tokio::test]
    async fn read_only_scope_is_forbidden() {
        let user = PortalUser::read_only(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;

        let use_case = RequestLogin::new(
            store,
            Arc::new(UrlOnlyBroker),
            "https://portal.test/api/broker/callback".to_string(),
        );

        let err = use_case.execute(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
