//! Terminal round result and equity drawdown tracking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::Timeframe;
use super::trade::Trade;

/// Running peak-to-trough drawdown over the equity curve.
///
/// Fed one equity sample per tick (balance + margin + unrealized P&L);
/// reports the deepest percentage drop from any running peak.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawdownTracker {
    peak: Decimal,
    max_drawdown_pct: Decimal,
}

impl DrawdownTracker {
    /// Create a tracker seeded with the starting equity.
    #[must_use]
    pub fn new(initial_equity: Decimal) -> Self {
        Self {
            peak: initial_equity,
            max_drawdown_pct: Decimal::ZERO,
        }
    }

    /// Record one equity sample.
    pub fn observe(&mut self, equity: Decimal) {
        if equity > self.peak {
            self.peak = equity;
            return;
        }
        if self.peak > Decimal::ZERO {
            let drawdown = (self.peak - equity) / self.peak * Decimal::ONE_HUNDRED;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    /// Deepest drawdown observed so far, percent.
    #[must_use]
    pub const fn max_drawdown_pct(&self) -> Decimal {
        self.max_drawdown_pct
    }
}

/// Terminal record of one trading round, emitted exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    /// Starting balance, USD.
    pub initial_balance: Decimal,
    /// Balance after final settlement, USD.
    pub final_balance: Decimal,
    /// Total return over the round, percent.
    pub total_return_pct: Decimal,
    /// Number of closed trades (partial closes and liquidations included).
    pub total_trades: u64,
    /// Trades with positive realized P&L.
    pub winning_trades: u64,
    /// Share of winning trades, percent.
    pub win_rate_pct: Decimal,
    /// Deepest equity drawdown over the round, percent.
    pub max_drawdown_pct: Decimal,
    /// Full trade history, oldest first.
    pub trades: Vec<Trade>,
    /// Timestamp of the first traded candle (RFC 3339).
    pub trading_start_time: String,
    /// Timestamp of the last traded candle (RFC 3339).
    pub trading_end_time: String,
    /// Coin symbol of the round.
    pub coin_symbol: String,
    /// Candle timeframe of the round.
    pub timeframe: Timeframe,
}

impl RoundResult {
    /// Total return of `final_balance` over `initial_balance`, percent.
    #[must_use]
    pub fn total_return_pct(initial_balance: Decimal, final_balance: Decimal) -> Decimal {
        if initial_balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (final_balance - initial_balance) / initial_balance * Decimal::ONE_HUNDRED
    }

    /// Winning-trade count and win rate (percent) over `trades`.
    #[must_use]
    pub fn win_stats(trades: &[Trade]) -> (u64, Decimal) {
        let winners = trades.iter().filter(|t| t.is_winner()).count() as u64;
        let rate = if trades.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(winners) / Decimal::from(trades.len() as u64) * Decimal::ONE_HUNDRED
        };
        (winners, rate)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::position::{MarginMode, Side};
    use crate::trade::TradeStatus;

    fn trade(pnl: Decimal) -> Trade {
        Trade {
            side: Side::Long,
            quantity: dec!(1),
            avg_entry_price: dec!(100),
            leverage: 10,
            margin_mode: MarginMode::Isolated,
            entry_timestamp_ms: 0,
            entry_time: String::new(),
            exit_price: dec!(100),
            exit_timestamp_ms: 0,
            exit_time: String::new(),
            pnl,
            fee: dec!(0),
            balance_after: dec!(0),
            status: TradeStatus::Closed,
        }
    }

    #[test]
    fn test_total_return_pct() {
        assert_eq!(
            RoundResult::total_return_pct(dec!(10000), dec!(12500)),
            dec!(25)
        );
        assert_eq!(
            RoundResult::total_return_pct(dec!(10000), dec!(7500)),
            dec!(-25)
        );
        assert_eq!(RoundResult::total_return_pct(dec!(0), dec!(100)), dec!(0));
    }

    #[test]
    fn test_win_stats() {
        let trades = vec![trade(dec!(10)), trade(dec!(-5)), trade(dec!(3)), trade(dec!(0))];
        let (winners, rate) = RoundResult::win_stats(&trades);
        assert_eq!(winners, 2);
        assert_eq!(rate, dec!(50));

        let (winners, rate) = RoundResult::win_stats(&[]);
        assert_eq!(winners, 0);
        assert_eq!(rate, dec!(0));
    }

    #[test]
    fn test_drawdown_tracks_peak_to_trough() {
        let mut tracker = DrawdownTracker::new(dec!(10000));
        tracker.observe(dec!(11000));
        tracker.observe(dec!(9900)); // -10% from 11000
        tracker.observe(dec!(12000));
        tracker.observe(dec!(11400)); // -5% from 12000
        assert_eq!(tracker.max_drawdown_pct(), dec!(10));
    }

    #[test]
    fn test_drawdown_flat_curve_is_zero() {
        let mut tracker = DrawdownTracker::new(dec!(10000));
        tracker.observe(dec!(10000));
        tracker.observe(dec!(10000));
        assert_eq!(tracker.max_drawdown_pct(), dec!(0));
    }

    #[test]
    fn test_drawdown_to_zero_equity_is_total() {
        let mut tracker = DrawdownTracker::new(dec!(10000));
        tracker.observe(dec!(0));
        assert_eq!(tracker.max_drawdown_pct(), dec!(100));
    }
}
