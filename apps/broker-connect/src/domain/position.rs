//! Broker Account Snapshots
//!
//! Read models returned by the broker after a session is established:
//! the account profile, margin summary, and position books.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Broker-side identity of the linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerProfile {
    /// Display name as registered with the broker.
    pub display_name: String,
    /// Broker's own identifier for the account.
    pub external_id: String,
    /// Name of the brokerage.
    pub broker_name: String,
}

/// Funds summary for the equity segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginSummary {
    /// Cash available for new positions.
    pub available_cash: Decimal,
    /// Margin currently blocked by open positions and orders.
    pub utilised: Decimal,
    /// Net account value.
    pub net: Decimal,
}

/// A single instrument position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Trading symbol of the instrument.
    pub symbol: String,
    /// Exchange the position sits on.
    pub exchange: String,
    /// Signed quantity. Positive is long, negative is short, zero is a
    /// closed position still reported by the broker for the day.
    pub quantity: i64,
    /// Average entry price.
    pub average_price: Decimal,
    /// Last traded price at snapshot time.
    pub last_price: Decimal,
    /// Profit and loss on the position.
    pub pnl: Decimal,
    /// Realized portion of the P&L.
    pub realised: Decimal,
    /// Unrealized portion of the P&L.
    pub unrealised: Decimal,
}

impl Position {
    /// True when the position still has open quantity.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.quantity != 0
    }
}

/// Net and day position books from one snapshot.
///
/// The net book spans the account's carryover holdings plus today's
/// activity; the day book covers only positions touched today.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionBook {
    /// Carryover plus intraday positions.
    pub net: Vec<Position>,
    /// Positions opened or closed today.
    pub day: Vec<Position>,
}

impl PositionBook {
    /// Filter both books down to positions with non-zero quantity.
    #[must_use]
    pub fn open_only(&self) -> Self {
        Self {
            net: self.net.iter().filter(|p| p.is_open()).cloned().collect(),
            day: self.day.iter().filter(|p| p.is_open()).cloned().collect(),
        }
    }

    /// Sum of P&L across the net book.
    #[must_use]
    pub fn total_net_pnl(&self) -> Decimal {
        self.net.iter().map(|p| p.pnl).sum()
    }

    /// Sum of P&L across the day book.
    #[must_use]
    pub fn total_day_pnl(&self) -> Decimal {
        self.day.iter().map(|p| p.pnl).sum()
    }
}
