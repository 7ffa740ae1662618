//! Infrastructure Layer
//!
//! Adapters behind the application ports: the Kite Connect HTTP client,
//! credential persistence, portal identity, the HTTP controller, and the
//! sealing codec the persistence adapters share.

pub mod broker;
pub mod http;
pub mod identity;
pub mod persistence;
pub mod sealing;
