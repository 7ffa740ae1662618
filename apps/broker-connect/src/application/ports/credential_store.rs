//! Credential Store Port (Driven Port)
//!
//! Persistence interface for per-user broker credential records. Every
//! write is a single atomic merge-update scoped to one user; adapters must
//! never interleave partial writes for the same user.

use async_trait::async_trait;

use crate::domain::credential::{BrokerCredential, CredentialPatch, UserId};

/// Credential store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The user has no credential record. Records are enrolled at startup
    /// for every known portal user, so this indicates store drift.
    #[error("no credential record for user {user_id}")]
    NotFound {
        /// The unknown user.
        user_id: UserId,
    },

    /// Storage backend failure. Never silently swallowed.
    #[error("credential store unavailable: {message}")]
    Unavailable {
        /// Backend error details.
        message: String,
    },

    /// A stored sensitive field could not be sealed or opened.
    #[error("credential codec failure: {message}")]
    Codec {
        /// Codec error details.
        message: String,
    },
}

/// Port for credential record persistence.
///
/// Sensitive fields (`api_key`, `api_secret`, `access_token`) cross this
/// boundary as plaintext; adapters seal them at rest and open them on read,
/// so callers never see ciphertext.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch one user's credential record.
    async fn get(&self, user_id: &UserId) -> Result<BrokerCredential, StoreError>;

    /// Apply a partial update to one user's record as a single atomic
    /// merge. Fields the patch does not touch keep their stored values.
    /// Returns the record after the merge.
    async fn set(
        &self,
        user_id: &UserId,
        patch: CredentialPatch,
    ) -> Result<BrokerCredential, StoreError>;

    /// Remove all sensitive fields and reset status fields to defaults.
    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError>;

    /// Create an empty record for the user when none exists. Idempotent;
    /// called once per known portal user at startup.
    async fn enroll(&self, user_id: &UserId) -> Result<(), StoreError>;
}
