//! Disconnect Broker Use Case

use std::sync::Arc;

use crate::application::ports::{CredentialStore, PortalUser};
use crate::domain::link_state::LinkState;
use crate::error::ServiceError;
use crate::observability::metrics;

/// Use case for tearing down a broker link.
///
/// Unconditional and idempotent: whatever state the record is in, the
/// result is a fully cleared record. A half-cleared record is a
/// correctness bug, so the clear is a single atomic store operation.
pub struct DisconnectBroker<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
}

impl<S> DisconnectBroker<S>
where
    S: CredentialStore,
{
    /// Create a new `DisconnectBroker` use case.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Clear all credential and session fields for the user.
    pub async fn execute(&self, user: &PortalUser) -> Result<(), ServiceError> {
        if !user.scope.can_mutate() {
            return Err(ServiceError::forbidden(
                "read-only access cannot disconnect a broker link",
            ));
        }

        let record = self.store.get(&user.user_id).await?;
        let from = record.state();

        self.store.clear(&user.user_id).await?;

        if from != LinkState::Unconfigured {
            metrics::record_link_transition(from, LinkState::Disconnected);
        }
        tracing::info!(user_id = %user.user_id, %from, "broker link disconnected");

        Ok(())
    }
}
