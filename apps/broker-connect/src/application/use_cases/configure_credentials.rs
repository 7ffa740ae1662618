//! Configure Credentials Use Case

use std::sync::Arc;

use crate::application::ports::{CredentialStore, PortalUser};
use crate::domain::credential::{BrokerCredential, CredentialPatch};
use crate::domain::link_state::{LinkState, LinkStateMachine};
use crate::error::ServiceError;
use crate::observability::metrics;

/// Use case for storing a user's broker API key pair.
pub struct ConfigureCredentials<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
}

impl<S> ConfigureCredentials<S>
where
    S: CredentialStore,
{
    /// Create a new `ConfigureCredentials` use case.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Store the key pair. Any previously authorized session is dropped in
    /// the same write, since a new key pair invalidates old tokens.
    pub async fn execute(
        &self,
        user: &PortalUser,
        api_key: &str,
        api_secret: &str,
    ) -> Result<BrokerCredential, ServiceError> {
        if !user.scope.can_mutate() {
            return Err(ServiceError::forbidden(
                "read-only access cannot change broker credentials",
            ));
        }

        let api_key = api_key.trim();
        let api_secret = api_secret.trim();
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(ServiceError::invalid_input(
                "apiKey and apiSecret are required",
            ));
        }

        // 1. Load the current record for the from-state.
        let current = self.store.get(&user.user_id).await?;
        let from = current.state();

        // 2. Entering credentials is legal from every reachable state.
        LinkStateMachine::validate_transition(from, LinkState::Configured)
            .map_err(|e| ServiceError::from_transition(&e))?;

        // 3. Single atomic write: store the pair, drop any stale session.
        let updated = self
            .store
            .set(&user.user_id, CredentialPatch::configure(api_key, api_secret))
            .await?;

        metrics::record_link_transition(from, LinkState::Configured);
        tracing::info!(user_id = %user.user_id, %from, "broker credentials configured");

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PortalUser;
    use crate::domain::credential::UserId;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use crate::infrastructure::sealing::SecretCodec;
    use chrono::Utc;

    async fn store_with_user(user_id: &UserId) -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::new(SecretCodec::ephemeral().unwrap()));
        store.enroll(user_id).await.unwrap();
        store
    }

    #[tokio::test]
    async fn configure_stores_pair() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;
        let use_case = ConfigureCredentials::new(store.clone());

        let record = use_case.execute(&user, "K1", "S1").await.unwrap();

        assert_eq!(record.state(), LinkState::Configured);
        assert!(!record.is_connected);
        assert_eq!(store.get(&user.user_id).await.unwrap().api_key.as_deref(), Some("K1"));
    }

    #[tokio::test]
    async fn configure_drops_stale_session() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;
        store
            .set(&user.user_id, CredentialPatch::configure("K1", "S1"))
            .await
            .unwrap();
        store
            .set(&user.user_id, CredentialPatch::authorized("tok", Utc::now()))
            .await
            .unwrap();

        let use_case = ConfigureCredentials::new(store.clone());
        let record = use_case.execute(&user, "K2", "S2").await.unwrap();

        assert_eq!(record.state(), LinkState::Configured);
        assert!(record.access_token.is_none());
        assert!(record.last_sync.is_none());
    }

    #[tokio::test]
    async fn configure_rejects_blank_fields() {
        let user = PortalUser::full(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;
        let use_case = ConfigureCredentials::new(store);

        let err = use_case.execute(&user, "  ", "S1").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn configure_requires_full_scope() {
        let user = PortalUser::read_only(UserId::new("u-1"));
        let store = store_with_user(&user.user_id).await;
        let use_case = ConfigureCredentials::new(store);

        let err = use_case.execute(&user, "K1", "S1").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Forbidden);
    }
}
