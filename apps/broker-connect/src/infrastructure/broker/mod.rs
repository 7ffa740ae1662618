//! Broker Adapters
//!
//! Implementations of `BrokerPort` for various brokers.

pub mod kite;

pub use kite::{KiteApiError, KiteConfig, KiteConnectAdapter};
