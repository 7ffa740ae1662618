// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Broker Connect - Broker Link Service Library
//!
//! Credential and session lifecycle service for the TradePort trading portal.
//! Lets a user link one external brokerage account, drives the OAuth-style
//! authorization flow against the broker, validates the resulting session,
//! and serves normalized positions and margins for linked accounts.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: credential record, link state machine, trading value objects
//!   - `credential`: `BrokerCredential` record and merge patches
//!   - `link_state`: explicit connection state machine
//!   - `position`: positions, margins, broker profile
//!
//! - **Application**: use cases and port definitions
//!   - `ports`: `CredentialStore`, `BrokerPort`, `IdentityPort`
//!   - `use_cases`: one use case per lifecycle operation; the only layer
//!     allowed to mutate connection state
//!
//! - **Infrastructure**: adapters (implementations)
//!   - `broker`: Kite Connect protocol adapter
//!   - `sealing`: AES-256-GCM secret codec applied inside the store
//!   - `persistence`: credential stores (Turso, in-memory)
//!   - `identity`: config-driven portal identity provider
//!   - `http`: Axum routes and identity middleware

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Service-level error taxonomy shared by all routes.
pub mod error;

/// Configuration loading and validation.
pub mod config;

/// Metrics for broker calls and lifecycle transitions.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::credential::{BrokerCredential, CredentialPatch, UserId};
pub use domain::link_state::LinkState;
pub use domain::position::{BrokerProfile, MarginSummary, Position, PositionBook};

// Application re-exports
pub use application::ports::{
    AccessScope, BrokerAuth, BrokerError, BrokerPort, BrokerSession, CredentialStore,
    IdentityPort, PortalUser, StoreError,
};
pub use application::use_cases::{
    CompleteAuthorization, ConfigureCredentials, DisconnectBroker, RequestLogin, SyncPositions,
    VerifyConnection,
};

// Infrastructure re-exports
pub use error::{ErrorCode, ServiceError};
pub use infrastructure::broker::kite::{KiteApiError, KiteConfig, KiteConnectAdapter};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::identity::StaticTokenIdentity;
pub use infrastructure::persistence::{InMemoryCredentialStore, TursoCredentialStore};
pub use infrastructure::sealing::{CodecError, SecretCodec};
