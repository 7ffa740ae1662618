//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure
//! dependencies. This layer defines:
//!
//! - **Value Objects**: Immutable domain types with equality by value
//! - **The credential record**: the single source of truth for a user's
//!   broker link, with its invariants
//! - **The link state machine**: every legal connection-state transition
//!
//! # Bounded Contexts
//!
//! - [`credential`]: the per-user broker credential record and its patches
//! - [`link_state`]: explicit connection state machine
//! - [`position`]: normalized trading data surfaced to the portal

pub mod credential;
pub mod link_state;
pub mod position;
