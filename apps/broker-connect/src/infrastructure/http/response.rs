//! HTTP response DTOs.
//!
//! Wire keys are camelCase; decimals serialize as JSON numbers for the
//! portal frontend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position::{BrokerProfile, Position, PositionBook};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status marker, always `ok` when the process answers.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Application version.
    pub version: String,
}

/// Response from `POST /api/broker/configure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    /// Always true; failures use the error body.
    pub success: bool,
    /// Connection flag after the write, always false for a fresh pair.
    pub is_connected: bool,
}

/// Response from `POST /api/broker/quick-refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRefreshResponse {
    /// Always true; failures use the error body.
    pub success: bool,
    /// Hosted broker login URL the portal should open.
    pub login_url: String,
}

/// Broker account identity inside a test-connection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    /// Display name registered with the broker.
    pub display_name: String,
    /// Broker-side account id.
    pub external_id: String,
    /// Name of the brokerage.
    pub broker_name: String,
}

impl From<BrokerProfile> for ProfileDto {
    fn from(profile: BrokerProfile) -> Self {
        Self {
            display_name: profile.display_name,
            external_id: profile.external_id,
            broker_name: profile.broker_name,
        }
    }
}

/// Response from `POST /api/broker/test-connection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    /// Always true; failures use the error body.
    pub success: bool,
    /// Equity cash balance stored by the validation.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    /// Broker account identity.
    pub profile: ProfileDto,
}

/// A single open position row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    /// Trading symbol.
    pub symbol: String,
    /// Exchange the position sits on.
    pub exchange: String,
    /// Signed quantity; never zero in a response.
    pub quantity: i64,
    /// Average entry price.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_price: Decimal,
    /// Last traded price.
    #[serde(with = "rust_decimal::serde::float")]
    pub last_price: Decimal,
    /// Profit and loss on the position.
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
}

impl From<Position> for PositionDto {
    fn from(position: Position) -> Self {
        Self {
            symbol: position.symbol,
            exchange: position.exchange,
            quantity: position.quantity,
            average_price: position.average_price,
            last_price: position.last_price,
            pnl: position.pnl,
        }
    }
}

/// Net and day books inside a positions response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionBookDto {
    /// Carryover plus intraday positions.
    pub net: Vec<PositionDto>,
    /// Positions touched today.
    pub day: Vec<PositionDto>,
}

impl From<PositionBook> for PositionBookDto {
    fn from(book: PositionBook) -> Self {
        Self {
            net: book.net.into_iter().map(PositionDto::from).collect(),
            day: book.day.into_iter().map(PositionDto::from).collect(),
        }
    }
}

/// Response from `GET /api/broker/positions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    /// Always true; failures use the error body.
    pub success: bool,
    /// Open positions per book.
    pub positions: PositionBookDto,
    /// Summed P&L across the returned net book.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_net: Decimal,
    /// Summed P&L across the returned day book.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_day: Decimal,
}

/// Response from `POST /api/broker/disconnect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectResponse {
    /// Always true; the clear is unconditional.
    pub success: bool,
}

/// Error body shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always false.
    pub success: bool,
    /// Stable snake_case wire code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Present and true when the client should prompt for API credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_credentials: Option<bool>,
    /// Present and true when the client should route through broker login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_auth: Option<bool>,
}
