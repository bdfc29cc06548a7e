//! Closed-trade records for round reporting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::{MarginMode, Position, Side};

/// How a trade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Voluntary close or end-of-round settlement.
    Closed,
    /// Forced exit at the liquidation price.
    Liquidation,
}

/// Record of one exit event (close, partial close, liquidation, or
/// settlement). Created exactly once per exit and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Position side.
    pub side: Side,
    /// Quantity exited, base-asset units.
    pub quantity: Decimal,
    /// Volume-weighted average entry price of the exited quantity.
    pub avg_entry_price: Decimal,
    /// Leverage of the position.
    pub leverage: u32,
    /// Margin mode of the position.
    pub margin_mode: MarginMode,
    /// Entry timestamp (ms).
    pub entry_timestamp_ms: i64,
    /// Entry timestamp (RFC 3339, for reporting).
    pub entry_time: String,
    /// Exit price.
    pub exit_price: Decimal,
    /// Exit timestamp (ms).
    pub exit_timestamp_ms: i64,
    /// Exit timestamp (RFC 3339, for reporting).
    pub exit_time: String,
    /// Realized P&L for the exited quantity (fees not included).
    pub pnl: Decimal,
    /// Taker fee charged on the exit fill.
    pub fee: Decimal,
    /// Account balance immediately after the exit settled.
    pub balance_after: Decimal,
    /// How the trade ended.
    pub status: TradeStatus,
}

impl Trade {
    /// Build an exit record from the position being (partially) exited.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_exit(
        position: &Position,
        quantity: Decimal,
        exit_price: Decimal,
        exit_timestamp_ms: i64,
        pnl: Decimal,
        fee: Decimal,
        balance_after: Decimal,
        status: TradeStatus,
    ) -> Self {
        Self {
            side: position.side,
            quantity,
            avg_entry_price: position.avg_entry_price,
            leverage: position.leverage,
            margin_mode: position.margin_mode,
            entry_timestamp_ms: position.entry_timestamp_ms,
            entry_time: position.entry_timestamp_rfc3339(),
            exit_price,
            exit_timestamp_ms,
            exit_time: chrono::DateTime::from_timestamp_millis(exit_timestamp_ms)
                .map_or_else(String::new, |dt| dt.to_rfc3339()),
            pnl,
            fee,
            balance_after,
            status,
        }
    }

    /// Check if this trade was profitable.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}
