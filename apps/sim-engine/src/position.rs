//! Open position state for the simulated futures account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::margin;

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Long (profits when price rises).
    Long,
    /// Short (profits when price falls).
    Short,
}

/// Margin mode, fixed for the lifetime of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginMode {
    /// Only the position's own margin is at risk.
    #[default]
    Isolated,
    /// The whole account balance backs the position.
    Cross,
}

/// A single entry leg (initial open or add).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFill {
    /// Quantity filled, base-asset units.
    pub quantity: Decimal,
    /// Fill price.
    pub price: Decimal,
}

/// Open leveraged position.
///
/// Invariants while a position exists: `total_quantity > 0`, `margin > 0`,
/// the side never changes, and `leverage`/`margin_mode` are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position side.
    pub side: Side,
    /// Total quantity, base-asset units.
    pub total_quantity: Decimal,
    /// Volume-weighted average entry price over all legs.
    pub avg_entry_price: Decimal,
    /// Leverage multiplier, in `[1, 100]`.
    pub leverage: u32,
    /// Margin mode.
    pub margin_mode: MarginMode,
    /// USD collateral allocated to this position.
    pub margin: Decimal,
    /// Liquidation price, recomputed on every entry leg.
    pub liquidation_price: Decimal,
    /// Candle index of the most recent entry leg. Liquidation checks are
    /// suppressed on this index so the entry candle's own wick cannot
    /// instantly liquidate the position.
    pub entry_index: usize,
    /// Timestamp of the first entry leg (ms).
    pub entry_timestamp_ms: i64,
    /// Entry legs, append-only, one per open/add.
    pub fills: Vec<EntryFill>,
}

impl Position {
    /// Notional value at the average entry price.
    #[must_use]
    pub fn entry_notional(&self) -> Decimal {
        self.avg_entry_price * self.total_quantity
    }

    /// Unrealized P&L at `mark_price`.
    #[must_use]
    pub fn unrealized_pnl(&self, mark_price: Decimal) -> Decimal {
        margin::unrealized_pnl(
            self.side,
            self.avg_entry_price,
            mark_price,
            self.total_quantity,
        )
    }

    /// Entry timestamp as an RFC 3339 string, empty if out of range.
    #[must_use]
    pub fn entry_timestamp_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.entry_timestamp_ms)
            .map_or_else(String::new, |dt| dt.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn position() -> Position {
        Position {
            side: Side::Long,
            total_quantity: dec!(2),
            avg_entry_price: dec!(50000),
            leverage: 10,
            margin_mode: MarginMode::Isolated,
            margin: dec!(10000),
            liquidation_price: dec!(45250),
            entry_index: 7,
            entry_timestamp_ms: 1_577_836_800_000,
            fills: vec![EntryFill {
                quantity: dec!(2),
                price: dec!(50000),
            }],
        }
    }

    #[test]
    fn test_entry_notional() {
        assert_eq!(position().entry_notional(), dec!(100000));
    }

    #[test]
    fn test_unrealized_pnl_long() {
        let pos = position();
        assert_eq!(pos.unrealized_pnl(dec!(51000)), dec!(2000));
        assert_eq!(pos.unrealized_pnl(dec!(49000)), dec!(-2000));
    }

    #[test]
    fn test_unrealized_pnl_short() {
        let pos = Position {
            side: Side::Short,
            ..position()
        };
        assert_eq!(pos.unrealized_pnl(dec!(49000)), dec!(2000));
    }

    #[test]
    fn test_margin_mode_default_is_isolated() {
        assert_eq!(MarginMode::default(), MarginMode::Isolated);
    }
}
