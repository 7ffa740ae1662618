//! Identity Port (Driven Port)
//!
//! Interface to the portal's identity collaborator. The service never
//! manages portal accounts itself; it only resolves an opaque portal token
//! to a user id and an access scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::credential::UserId;

/// What an authenticated caller may do with a broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    /// Owner of the link. May configure, authorize, and disconnect.
    Full,
    /// Support or audit view of someone else's link. May read state and
    /// positions, never mutate.
    ReadOnly,
}

impl AccessScope {
    /// True when the caller may mutate the link.
    #[must_use]
    pub const fn can_mutate(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// An authenticated portal caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUser {
    /// Portal user the request acts on.
    pub user_id: UserId,
    /// What the caller may do.
    pub scope: AccessScope,
}

impl PortalUser {
    /// Create a portal user with full access.
    #[must_use]
    pub const fn full(user_id: UserId) -> Self {
        Self {
            user_id,
            scope: AccessScope::Full,
        }
    }

    /// Create a read-only portal user.
    #[must_use]
    pub const fn read_only(user_id: UserId) -> Self {
        Self {
            user_id,
            scope: AccessScope::ReadOnly,
        }
    }
}

/// Port for portal identity resolution.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Resolve a portal token to an authenticated user. `None` means the
    /// token is unknown, which callers surface as `401`.
    async fn authenticate(&self, token: &str) -> Option<PortalUser>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_gates_mutation() {
        assert!(AccessScope::Full.can_mutate());
        assert!(!AccessScope::ReadOnly.can_mutate());
    }

    #[test]
    fn portal_user_constructors() {
        let user = PortalUser::full(UserId::new("u-1"));
        assert_eq!(user.scope, AccessScope::Full);

        let viewer = PortalUser::read_only(UserId::new("u-1"));
        assert_eq!(viewer.scope, AccessScope::ReadOnly);
    }
}
