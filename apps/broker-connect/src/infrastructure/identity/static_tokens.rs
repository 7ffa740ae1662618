//! Static token identity adapter.
//!
//! Resolves portal bearer tokens from a fixed table loaded at startup. The
//! portal owns account management; this adapter only answers which user and
//! scope a token acts as.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::application::ports::{IdentityPort, PortalUser};
use crate::domain::credential::UserId;

/// Identity adapter backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, PortalUser>,
}

impl StaticTokenIdentity {
    /// Build the table from `(token, user)` pairs. A repeated token keeps
    /// the entry seen last.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, PortalUser)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }

    /// Users holding at least one token. The server enrolls a credential
    /// row for each of these at startup.
    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.tokens.values().map(|user| &user.user_id)
    }
}

#[async_trait]
impl IdentityPort for StaticTokenIdentity {
    async fn authenticate(&self, token: &str) -> Option<PortalUser> {
        self.tokens.get(token).cloned()
    }
}
