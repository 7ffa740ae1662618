//! The per-user broker credential record and its merge patches.
//!
//! `BrokerCredential` is the durable source of truth for one user's broker
//! link. It is mutated only through [`CredentialPatch`] values, one per
//! lifecycle transition, so every write names exactly the fields that
//! transition is allowed to touch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::link_state::LinkState;

/// Identifier of a portal user, issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new identifier from a string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a new unique identifier using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One user's broker link: credentials plus connection status.
///
/// Invariants:
/// - `is_connected = true` requires `access_token` to be present.
/// - An absent `access_token` forces `is_connected = false`.
///
/// Both are upheld by construction: the only writes are the patches below,
/// and none of them can produce a connected record without a token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrokerCredential {
    /// Broker-issued API key, provided by the user. Absent until configured.
    pub api_key: Option<String>,
    /// Broker-issued API secret, provided by the user. Absent until configured.
    pub api_secret: Option<String>,
    /// Broker-issued access token. Absent until the OAuth exchange succeeds.
    pub access_token: Option<String>,
    /// True only after a successful live validation call.
    pub is_connected: bool,
    /// Last known cash balance, refreshed only on validation.
    pub balance: Decimal,
    /// Timestamp of the last successful token exchange or validation.
    pub last_sync: Option<DateTime<Utc>>,
}

impl BrokerCredential {
    /// An empty record, the shape a fresh (or disconnected) user has.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive the connection state from the stored fields.
    ///
    /// `Unconfigured` and `Disconnected` share this representation (an
    /// empty record); `AwaitingAuthorization` is transient and never
    /// persisted, so it is never derived.
    #[must_use]
    pub fn state(&self) -> LinkState {
        if self.api_key.is_none() || self.api_secret.is_none() {
            LinkState::Unconfigured
        } else if self.access_token.is_none() {
            LinkState::Configured
        } else if self.is_connected {
            LinkState::Connected
        } else {
            LinkState::Authorized
        }
    }

    /// True when both API key and secret are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// True when an access token is present.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Check the record invariant: connected implies token present.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        !self.is_connected || self.access_token.is_some()
    }

    /// Apply a merge patch, returning the updated record.
    ///
    /// The merged record always satisfies the connection invariant: when a
    /// concurrent clear removed the access token, a racing connected-flag
    /// update is clamped back to false instead of producing a record that
    /// claims a live session without a token.
    #[must_use]
    pub fn apply(mut self, patch: &CredentialPatch) -> Self {
        self.api_key = patch.api_key.resolve(self.api_key);
        self.api_secret = patch.api_secret.resolve(self.api_secret);
        self.access_token = patch.access_token.resolve(self.access_token);
        self.last_sync = patch.last_sync.resolve(self.last_sync);
        if let Some(connected) = patch.is_connected {
            self.is_connected = connected;
        }
        if let Some(balance) = patch.balance {
            self.balance = balance;
        }
        if self.access_token.is_none() {
            self.is_connected = false;
        }
        self
    }
}

/// Tri-state update for a single optional field inside a merge patch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
    /// Remove the stored value.
    Unset,
}

impl<T> FieldUpdate<T> {
    /// Resolve this update against the currently stored value.
    pub fn resolve(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Self::Keep => current,
            Self::Set(value) => Some(value.clone()),
            Self::Unset => None,
        }
    }

    /// True unless this update is `Keep`.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Keep)
    }
}

/// A merge update against one user's credential record.
///
/// Applied atomically by the store; fields left at their defaults are not
/// written. Use the transition constructors rather than building patches by
/// hand so each lifecycle step touches exactly the fields its table row
/// names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialPatch {
    /// API key update.
    pub api_key: FieldUpdate<String>,
    /// API secret update.
    pub api_secret: FieldUpdate<String>,
    /// Access token update.
    pub access_token: FieldUpdate<String>,
    /// Last-sync timestamp update.
    pub last_sync: FieldUpdate<DateTime<Utc>>,
    /// Connection flag update.
    pub is_connected: Option<bool>,
    /// Balance update.
    pub balance: Option<Decimal>,
}

impl CredentialPatch {
    /// Unconfigured→Configured: install a key pair.
    ///
    /// Any stale access token, sync timestamp, or balance from a previous
    /// link is dropped in the same write; a token obtained under the old
    /// key pair is meaningless for the new one.
    #[must_use]
    pub fn configure(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: FieldUpdate::Set(api_key.into()),
            api_secret: FieldUpdate::Set(api_secret.into()),
            access_token: FieldUpdate::Unset,
            last_sync: FieldUpdate::Unset,
            is_connected: Some(false),
            balance: Some(Decimal::ZERO),
        }
    }

    /// AwaitingAuthorization→Authorized: store the exchanged access token.
    #[must_use]
    pub fn authorized(access_token: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            access_token: FieldUpdate::Set(access_token.into()),
            last_sync: FieldUpdate::Set(at),
            is_connected: Some(false),
            ..Self::default()
        }
    }

    /// Authorized/Connected→Connected: record a successful validation.
    #[must_use]
    pub fn connected(balance: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            last_sync: FieldUpdate::Set(at),
            is_connected: Some(true),
            balance: Some(balance),
            ..Self::default()
        }
    }

    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.api_key.is_change()
            && !self.api_secret.is_change()
            && !self.access_token.is_change()
            && !self.last_sync.is_change()
            && self.is_connected.is_none()
            && self.balance.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn authorized_record() -> BrokerCredential {
        BrokerCredential {
            api_key: Some("K1".to_string()),
            api_secret: Some("S1".to_string()),
            access_token: Some("T1".to_string()),
            is_connected: false,
            balance: Decimal::ZERO,
            last_sync: Some(Utc::now()),
        }
    }

    #[test]
    fn user_id_new_and_display() {
        let id = UserId::new("user-123");
        assert_eq!(id.as_str(), "user-123");
        assert_eq!(format!("{id}"), "user-123");
    }

    #[test]
    fn user_id_generate_is_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[test]
    fn empty_record_is_unconfigured() {
        let record = BrokerCredential::empty();
        assert_eq!(record.state(), LinkState::Unconfigured);
        assert!(!record.has_credentials());
        assert!(!record.has_access_token());
        assert!(record.invariant_holds());
    }

    #[test]
    fn state_derivation_follows_stored_fields() {
        let configured = BrokerCredential::empty().apply(&CredentialPatch::configure("K1", "S1"));
        assert_eq!(configured.state(), LinkState::Configured);

        let authorized = configured.apply(&CredentialPatch::authorized("T1", Utc::now()));
        assert_eq!(authorized.state(), LinkState::Authorized);

        let connected = authorized.apply(&CredentialPatch::connected(dec!(5000), Utc::now()));
        assert_eq!(connected.state(), LinkState::Connected);
    }

    #[test]
    fn configure_drops_stale_session_fields() {
        let connected = authorized_record().apply(&CredentialPatch::connected(
            dec!(5000),
            Utc::now(),
        ));

        let reconfigured = connected.apply(&CredentialPatch::configure("K2", "S2"));

        assert_eq!(reconfigured.api_key.as_deref(), Some("K2"));
        assert_eq!(reconfigured.api_secret.as_deref(), Some("S2"));
        assert_eq!(reconfigured.access_token, None);
        assert_eq!(reconfigured.last_sync, None);
        assert!(!reconfigured.is_connected);
        assert_eq!(reconfigured.balance, Decimal::ZERO);
        assert_eq!(reconfigured.state(), LinkState::Configured);
    }

    #[test]
    fn authorized_patch_sets_token_and_sync_only() {
        let now = Utc::now();
        let record = BrokerCredential::empty()
            .apply(&CredentialPatch::configure("K1", "S1"))
            .apply(&CredentialPatch::authorized("T1", now));

        assert_eq!(record.api_key.as_deref(), Some("K1"));
        assert_eq!(record.access_token.as_deref(), Some("T1"));
        assert_eq!(record.last_sync, Some(now));
        assert!(!record.is_connected);
    }

    #[test]
    fn connected_patch_preserves_credentials() {
        let record = authorized_record().apply(&CredentialPatch::connected(dec!(12345.67), Utc::now()));

        assert_eq!(record.api_key.as_deref(), Some("K1"));
        assert_eq!(record.access_token.as_deref(), Some("T1"));
        assert!(record.is_connected);
        assert_eq!(record.balance, dec!(12345.67));
        assert!(record.invariant_holds());
    }

    #[test]
    fn no_patch_can_connect_without_token() {
        let configured = BrokerCredential::empty().apply(&CredentialPatch::configure("K1", "S1"));

        // A connected-flag patch racing against a clear would otherwise
        // claim a live session without a token; the merge clamps it.
        let merged = configured.apply(&CredentialPatch::connected(dec!(1), Utc::now()));
        assert!(!merged.is_connected);
        assert!(merged.invariant_holds());
        assert_ne!(merged.state(), LinkState::Connected);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let record = authorized_record();
        let patch = CredentialPatch::default();
        assert!(patch.is_empty());
        assert_eq!(record.clone().apply(&patch), record);
    }

    #[test]
    fn field_update_resolution() {
        assert_eq!(
            FieldUpdate::<String>::Keep.resolve(Some("a".to_string())),
            Some("a".to_string())
        );
        assert_eq!(
            FieldUpdate::Set("b".to_string()).resolve(Some("a".to_string())),
            Some("b".to_string())
        );
        assert_eq!(FieldUpdate::<String>::Unset.resolve(Some("a".to_string())), None);
    }
}
