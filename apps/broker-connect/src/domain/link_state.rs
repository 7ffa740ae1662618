//! Link State Machine
//!
//! Validates broker connection state transitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Connection state of a user's broker link.
///
/// `AwaitingAuthorization` is transient: it exists between handing the user
/// a login URL and receiving the broker's redirect, and is never persisted.
/// `Disconnected` and `Unconfigured` share a storage representation (an
/// empty record); they are distinct states because they are reached by
/// different transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No credentials stored.
    Unconfigured,
    /// API key and secret stored; no access token yet.
    Configured,
    /// Login URL issued; waiting for the broker redirect.
    AwaitingAuthorization,
    /// Access token stored; not yet validated against the live broker.
    Authorized,
    /// Access token validated; balance and profile confirmed.
    Connected,
    /// Link torn down, by the user or by a failed validation.
    Disconnected,
}

impl LinkState {
    /// True when a key pair is present (state Configured or later).
    #[must_use]
    pub const fn is_configured(self) -> bool {
        matches!(
            self,
            Self::Configured | Self::AwaitingAuthorization | Self::Authorized | Self::Connected
        )
    }

    /// True when an access token is available for broker calls.
    #[must_use]
    pub const fn has_authorization(self) -> bool {
        matches!(self, Self::Authorized | Self::Connected)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::AwaitingAuthorization => "awaiting_authorization",
            Self::Authorized => "authorized",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{name}")
    }
}

/// Error produced when a lifecycle step would skip a state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid link transition from {from} to {to}: {reason}")]
pub struct InvalidTransition {
    /// State the record is in.
    pub from: LinkState,
    /// State the step tried to reach.
    pub to: LinkState,
    /// Why the transition is not allowed.
    pub reason: String,
}

/// Link state machine for validating transitions.
pub struct LinkStateMachine;

impl LinkStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: LinkState, to: LinkState) -> bool {
        matches!(
            (from, to),
            // From Unconfigured: only credential entry moves forward.
            (LinkState::Unconfigured, LinkState::Configured)
                // From Configured: re-enter credentials, or start the
                // authorization flow.
                | (LinkState::Configured, LinkState::Configured)
                | (LinkState::Configured, LinkState::AwaitingAuthorization)
                // From AwaitingAuthorization: the broker redirect either
                // carries a request token or a failure status.
                | (LinkState::AwaitingAuthorization, LinkState::Authorized)
                | (LinkState::AwaitingAuthorization, LinkState::Disconnected)
                // From Authorized: validate, re-authorize, re-configure, or
                // tear down.
                | (LinkState::Authorized, LinkState::Connected)
                | (LinkState::Authorized, LinkState::AwaitingAuthorization)
                | (LinkState::Authorized, LinkState::Configured)
                | (LinkState::Authorized, LinkState::Disconnected)
                // From Connected: revalidate, re-authorize, re-configure, or
                // tear down.
                | (LinkState::Connected, LinkState::Connected)
                | (LinkState::Connected, LinkState::AwaitingAuthorization)
                | (LinkState::Connected, LinkState::Configured)
                | (LinkState::Connected, LinkState::Disconnected)
                // From Disconnected: same footing as a fresh record.
                | (LinkState::Disconnected, LinkState::Configured)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid.
    pub fn validate_transition(from: LinkState, to: LinkState) -> Result<(), InvalidTransition> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: LinkState, to: LinkState) -> String {
        match from {
            LinkState::Unconfigured => {
                format!("no credentials stored, cannot transition to {to}")
            }
            LinkState::Configured if to == LinkState::Connected => {
                "no access token stored, authorization must complete first".to_string()
            }
            _ => format!("invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: LinkState) -> Vec<LinkState> {
        match from {
            LinkState::Unconfigured => vec![LinkState::Configured],
            LinkState::Configured => {
                vec![LinkState::Configured, LinkState::AwaitingAuthorization]
            }
            LinkState::AwaitingAuthorization => {
                vec![LinkState::Authorized, LinkState::Disconnected]
            }
            LinkState::Authorized => vec![
                LinkState::Connected,
                LinkState::AwaitingAuthorization,
                LinkState::Configured,
                LinkState::Disconnected,
            ],
            LinkState::Connected => vec![
                LinkState::Connected,
                LinkState::AwaitingAuthorization,
                LinkState::Configured,
                LinkState::Disconnected,
            ],
            LinkState::Disconnected => vec![LinkState::Configured],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LinkState::Unconfigured, LinkState::Configured, true; "configure fresh record")]
    #[test_case(LinkState::Configured, LinkState::AwaitingAuthorization, true; "request login link")]
    #[test_case(LinkState::AwaitingAuthorization, LinkState::Authorized, true; "successful exchange")]
    #[test_case(LinkState::AwaitingAuthorization, LinkState::Disconnected, true; "failed redirect")]
    #[test_case(LinkState::Authorized, LinkState::Connected, true; "first validation")]
    #[test_case(LinkState::Connected, LinkState::Connected, true; "revalidation")]
    #[test_case(LinkState::Connected, LinkState::Disconnected, true; "user disconnect")]
    #[test_case(LinkState::Authorized, LinkState::Disconnected, true; "rejected token")]
    #[test_case(LinkState::Unconfigured, LinkState::Connected, false; "cannot connect without credentials")]
    #[test_case(LinkState::Unconfigured, LinkState::Authorized, false; "cannot authorize without credentials")]
    #[test_case(LinkState::Configured, LinkState::Connected, false; "cannot connect without token")]
    #[test_case(LinkState::Disconnected, LinkState::Connected, false; "disconnected must reconfigure")]
    #[test_case(LinkState::Disconnected, LinkState::Authorized, false; "disconnected cannot reauthorize directly")]
    fn transition_table(from: LinkState, to: LinkState, expected: bool) {
        assert_eq!(LinkStateMachine::is_valid_transition(from, to), expected);
    }

    #[test]
    fn reconfigure_is_allowed_from_any_populated_state() {
        for from in [
            LinkState::Configured,
            LinkState::Authorized,
            LinkState::Connected,
            LinkState::Disconnected,
        ] {
            assert!(
                LinkStateMachine::is_valid_transition(from, LinkState::Configured),
                "reconfigure should be valid from {from}"
            );
        }
    }

    #[test]
    fn validate_transition_returns_error_for_invalid() {
        let result =
            LinkStateMachine::validate_transition(LinkState::Unconfigured, LinkState::Connected);
        let Err(err) = result else {
            panic!("expected invalid transition error");
        };
        assert_eq!(err.from, LinkState::Unconfigured);
        assert_eq!(err.to, LinkState::Connected);
        assert!(err.reason.contains("no credentials"));
    }

    #[test]
    fn validate_transition_returns_ok_for_valid() {
        assert!(
            LinkStateMachine::validate_transition(LinkState::Authorized, LinkState::Connected)
                .is_ok()
        );
    }

    #[test]
    fn configured_to_connected_names_missing_token() {
        let reason =
            LinkStateMachine::transition_error_reason(LinkState::Configured, LinkState::Connected);
        assert!(reason.contains("access token"));
    }

    #[test]
    fn valid_next_states_match_transition_table() {
        for from in [
            LinkState::Unconfigured,
            LinkState::Configured,
            LinkState::AwaitingAuthorization,
            LinkState::Authorized,
            LinkState::Connected,
            LinkState::Disconnected,
        ] {
            for to in LinkStateMachine::valid_next_states(from) {
                assert!(LinkStateMachine::is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn helper_predicates() {
        assert!(!LinkState::Unconfigured.is_configured());
        assert!(LinkState::Configured.is_configured());
        assert!(!LinkState::Configured.has_authorization());
        assert!(LinkState::Authorized.has_authorization());
        assert!(LinkState::Connected.has_authorization());
        assert!(!LinkState::Disconnected.has_authorization());
    }
}
