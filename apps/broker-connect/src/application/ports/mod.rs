//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod broker_port;
mod credential_store;
mod identity_port;

pub use broker_port::{BrokerAuth, BrokerError, BrokerPort, BrokerSession};
pub use credential_store::{CredentialStore, StoreError};
pub use identity_port::{AccessScope, IdentityPort, PortalUser};
