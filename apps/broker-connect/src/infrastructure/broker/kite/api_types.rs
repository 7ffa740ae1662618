//! Kite Connect API response types.
//!
//! These types map directly to Kite's REST envelope format. Required fields
//! are deliberately non-optional so a malformed body surfaces as a decode
//! failure instead of a zeroed record.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::BrokerSession;
use crate::domain::position::{BrokerProfile, MarginSummary, Position, PositionBook};

// ============================================================================
// Response Envelope
// ============================================================================

/// Kite wraps every response in a status envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KiteEnvelope<T> {
    /// Successful response carrying the payload.
    Success {
        /// Endpoint-specific payload.
        data: T,
    },
    /// Error response.
    Error {
        /// Kite error class, e.g. `TokenException`.
        #[serde(default)]
        error_type: String,
        /// Human-readable reason.
        message: String,
    },
}

// ============================================================================
// Session Types
// ============================================================================

/// Payload of a successful `/session/token` exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteSessionResponse {
    /// Access token for subsequent data calls.
    pub access_token: String,
    /// Broker account identifier.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Account display name.
    #[serde(default)]
    pub user_name: Option<String>,
}

impl KiteSessionResponse {
    /// Convert to the port-level session.
    #[must_use]
    pub fn into_session(self) -> BrokerSession {
        BrokerSession {
            access_token: self.access_token,
            external_id: self.user_id,
            display_name: self.user_name,
        }
    }
}

// ============================================================================
// Profile Types
// ============================================================================

/// Payload of `/user/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteProfileResponse {
    /// Broker account identifier.
    pub user_id: String,
    /// Account display name.
    pub user_name: String,
    /// Brokerage name.
    #[serde(default)]
    pub broker: String,
}

impl KiteProfileResponse {
    /// Convert to the domain profile.
    #[must_use]
    pub fn into_profile(self) -> BrokerProfile {
        BrokerProfile {
            display_name: self.user_name,
            external_id: self.user_id,
            broker_name: self.broker,
        }
    }
}

// ============================================================================
// Margin Types
// ============================================================================

/// Payload of `/user/margins`. Only the equity segment is read.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteMarginsResponse {
    /// Equity segment margins.
    pub equity: KiteMarginSegment,
}

/// One margin segment.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteMarginSegment {
    /// Net margin after utilisation.
    pub net: Decimal,
    /// Funds available to trade.
    pub available: KiteMarginAvailable,
    /// Funds locked by open positions and orders.
    pub utilised: KiteMarginUtilised,
}

/// Available funds within a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteMarginAvailable {
    /// Free cash balance.
    pub cash: Decimal,
}

/// Utilised funds within a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct KiteMarginUtilised {
    /// Total debits against the balance.
    pub debits: Decimal,
}

impl KiteMarginsResponse {
    /// Convert to the domain margin summary.
    #[must_use]
    pub fn into_summary(self) -> MarginSummary {
        MarginSummary {
            available_cash: self.equity.available.cash,
            utilised: self.equity.utilised.debits,
            net: self.equity.net,
        }
    }
}

// ============================================================================
// Position Types
// ============================================================================

/// Payload of `/portfolio/positions`.
#[derive(Debug, Clone, Deserialize)]
pub struct KitePositionsResponse {
    /// Carried-forward plus intraday positions.
    pub net: Vec<KitePositionEntry>,
    /// Positions opened today.
    pub day: Vec<KitePositionEntry>,
}

/// One position row.
#[derive(Debug, Clone, Deserialize)]
pub struct KitePositionEntry {
    /// Instrument symbol.
    pub tradingsymbol: String,
    /// Exchange the instrument trades on.
    pub exchange: String,
    /// Signed quantity; negative for shorts.
    pub quantity: i64,
    /// Average entry price.
    pub average_price: Decimal,
    /// Last traded price.
    pub last_price: Decimal,
    /// Total profit and loss.
    pub pnl: Decimal,
    /// Realised component of the P&L.
    pub realised: Decimal,
    /// Unrealised component of the P&L.
    pub unrealised: Decimal,
}

impl KitePositionEntry {
    /// Convert to the domain position.
    #[must_use]
    pub fn into_position(self) -> Position {
        Position {
            symbol: self.tradingsymbol,
            exchange: self.exchange,
            quantity: self.quantity,
            average_price: self.average_price,
            last_price: self.last_price,
            pnl: self.pnl,
            realised: self.realised,
            unrealised: self.unrealised,
        }
    }
}

impl KitePositionsResponse {
    /// Convert to the domain position book.
    #[must_use]
    pub fn into_book(self) -> PositionBook {
        PositionBook {
            net: self
                .net
                .into_iter()
                .map(KitePositionEntry::into_position)
                .collect(),
            day: self
                .day
                .into_iter()
                .map(KitePositionEntry::into_position)
                .collect(),
        }
    }
}
