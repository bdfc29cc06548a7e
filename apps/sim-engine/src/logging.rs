//! Structured logging for round lifecycle events.
//!
//! # Log Levels
//!
//! - **INFO**: Normal operations (round start/end, opens, closes)
//! - **WARN**: Liquidations and rejected actions
//! - **DEBUG**: Per-tick detail

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::RoundConfig;
use super::ledger::LedgerError;
use super::result::RoundResult;
use super::trade::Trade;

/// Round lifecycle event for structured logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// Round started.
    RoundStart(RoundStartEvent),
    /// Round ended and settled.
    RoundEnd(RoundEndEvent),
    /// Open position was force-closed at its liquidation price.
    Liquidation(LiquidationEvent),
    /// A user action was rejected.
    ActionRejected(ActionRejectedEvent),
}

/// Round start event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStartEvent {
    /// Coin symbol.
    pub coin_symbol: String,
    /// Timeframe label.
    pub timeframe: String,
    /// Starting balance.
    pub initial_balance: Decimal,
    /// First tradable candle index.
    pub start_index: usize,
    /// Candles in the trading period.
    pub trading_period: usize,
}

/// Round end event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEndEvent {
    /// Final balance after settlement.
    pub final_balance: Decimal,
    /// Total return percentage.
    pub total_return_pct: Decimal,
    /// Total trades executed.
    pub total_trades: u64,
    /// Deepest equity drawdown percentage.
    pub max_drawdown_pct: Decimal,
}

/// Liquidation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    /// Position side.
    pub side: String,
    /// Margin mode.
    pub margin_mode: String,
    /// Liquidation price.
    pub liquidation_price: Decimal,
    /// Realized loss.
    pub loss: Decimal,
    /// Balance after liquidation.
    pub balance_after: Decimal,
}

/// Action rejected event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRejectedEvent {
    /// Action that was attempted.
    pub action: String,
    /// Rejection reason.
    pub reason: String,
}

/// Log round start.
pub fn log_round_start(config: &RoundConfig) {
    info!(
        coin_symbol = %config.coin_symbol,
        timeframe = %config.timeframe.label(),
        initial_balance = %config.initial_balance,
        start_index = config.start_index,
        trading_period = config.trading_period,
        "Round started"
    );
}

/// Log round end with its settled result.
pub fn log_round_end(result: &RoundResult) {
    info!(
        final_balance = %result.final_balance,
        total_return_pct = %result.total_return_pct,
        total_trades = result.total_trades,
        win_rate_pct = %result.win_rate_pct,
        max_drawdown_pct = %result.max_drawdown_pct,
        "Round ended"
    );
}

/// Log a liquidation trade.
pub fn log_liquidation(trade: &Trade) {
    warn!(
        side = ?trade.side,
        margin_mode = ?trade.margin_mode,
        liquidation_price = %trade.exit_price,
        loss = %trade.pnl,
        balance_after = %trade.balance_after,
        "Position liquidated"
    );
}

/// Log a rejected user action.
pub fn log_action_rejected(action: &str, error: &LedgerError) {
    warn!(action, reason = %error, "Action rejected");
}

/// Build a serializable liquidation event from a trade.
#[must_use]
pub fn create_liquidation_event(trade: &Trade) -> RoundEvent {
    RoundEvent::Liquidation(LiquidationEvent {
        side: format!("{:?}", trade.side),
        margin_mode: format!("{:?}", trade.margin_mode),
        liquidation_price: trade.exit_price,
        loss: trade.pnl,
        balance_after: trade.balance_after,
    })
}

/// Build a serializable round start event from a config.
#[must_use]
pub fn create_round_start_event(config: &RoundConfig) -> RoundEvent {
    RoundEvent::RoundStart(RoundStartEvent {
        coin_symbol: config.coin_symbol.clone(),
        timeframe: config.timeframe.label().to_string(),
        initial_balance: config.initial_balance,
        start_index: config.start_index,
        trading_period: config.trading_period,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::Timeframe;

    #[test]
    fn test_round_start_event_serializes_with_tag() {
        let config = RoundConfig {
            coin_symbol: "ETH".to_string(),
            timeframe: Timeframe::H1,
            initial_balance: dec!(5000),
            start_index: 100,
            trading_period: 50,
        };
        let event = create_round_start_event(&config);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "round_start");
        assert_eq!(json["coin_symbol"], "ETH");
        assert_eq!(json["timeframe"], "1h");
    }
}
