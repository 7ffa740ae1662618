//! Kite Connect Broker Adapter
//!
//! Implementation of `BrokerPort` for the Zerodha Kite Connect REST API:
//! - Hosted login URL construction
//! - Checksum-signed request token exchange
//! - Authenticated profile, margin, and position reads
//!
//! Every call is a single round trip with a bounded timeout. Request tokens
//! are single-use, so nothing here retries.

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::KiteConnectAdapter;
pub use config::KiteConfig;
pub use error::KiteApiError;
