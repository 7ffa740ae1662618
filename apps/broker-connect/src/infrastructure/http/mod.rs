//! HTTP/REST API adapter.
//!
//! Inbound adapter implementing the portal-facing REST endpoints that
//! delegate to application use cases.

mod controller;
mod request;
mod response;

pub use controller::{ApiError, AppState, PortalLinks, create_router};
pub use request::*;
pub use response::*;
