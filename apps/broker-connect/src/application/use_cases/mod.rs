//! Application Use Cases
//!
//! One use case per lifecycle operation. Each checks caller scope and the
//! current link state before touching the store, and applies every store
//! mutation as a single merge-update.

mod complete_authorization;
mod configure_credentials;
mod disconnect_broker;
mod request_login;
mod sync_positions;
mod verify_connection;

pub use complete_authorization::{CallbackOutcome, CompleteAuthorization};
pub use configure_credentials::ConfigureCredentials;
pub use disconnect_broker::DisconnectBroker;
pub use request_login::RequestLogin;
pub use sync_positions::{PositionReport, SyncPositions};
pub use verify_connection::{ConnectionReport, VerifyConnection};
