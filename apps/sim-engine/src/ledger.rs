//! Position ledger: balance, open position, and closed-trade history.
//!
//! All transitions are synchronous and atomic; a rejected action returns an
//! error and leaves the ledger untouched. Liquidation and settlement are
//! normal transitions, not errors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::margin::{
    DUST_QUANTITY, TAKER_FEE_RATE, liquidation_price, margin_required, taker_fee, unrealized_pnl,
    weighted_average_entry,
};
use super::position::{EntryFill, MarginMode, Position, Side};
use super::trade::{Trade, TradeStatus};

/// Leverage bounds accepted by [`PositionLedger::set_leverage`].
pub const LEVERAGE_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// Ledger operation errors. All are locally recoverable; the caller decides
/// whether to retry with different inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Balance cannot cover the required margin plus fee.
    #[error("insufficient margin: need {required}, available {available}")]
    InsufficientMargin {
        /// Margin plus fee required for the order.
        required: Decimal,
        /// Balance available.
        available: Decimal,
    },

    /// A position on the opposite side is open; it must be closed first.
    #[error("opposite-side order blocked while a position is open")]
    OppositeSideBlocked,

    /// Quantity is not a positive number.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    /// Mark price is not a positive number.
    #[error("invalid mark price: {0}")]
    InvalidPrice(Decimal),

    /// Leverage and margin mode are only settable while flat.
    #[error("setting is locked while a position is open")]
    PositionOpen,

    /// Operation requires an open position.
    #[error("no open position")]
    NoPosition,
}

/// Outcome of an accepted open/add order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenReceipt {
    /// Margin debited from the balance and locked into the position.
    pub margin_locked: Decimal,
    /// Taker fee charged on the entry fill.
    pub fee: Decimal,
}

/// Outcome of an accepted close order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseReceipt {
    /// The trade record appended to the history.
    pub trade: Trade,
    /// Net balance change (margin returned + pnl - fee).
    pub balance_delta: Decimal,
    /// Quantity still open after the close; zero when fully closed.
    pub remaining_quantity: Decimal,
}

/// Simulated futures account: free balance, at most one open position, and
/// the append-only trade history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLedger {
    balance: Decimal,
    leverage: u32,
    margin_mode: MarginMode,
    position: Option<Position>,
    trades: Vec<Trade>,
}

impl PositionLedger {
    /// Create a ledger with `initial_balance` USD and no position.
    #[must_use]
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: initial_balance,
            leverage: 1,
            margin_mode: MarginMode::default(),
            position: None,
            trades: Vec::new(),
        }
    }

    /// Free balance (margin locked in an open position is excluded).
    #[must_use]
    pub const fn balance(&self) -> Decimal {
        self.balance
    }

    /// Current open position, if any.
    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Closed-trade history, oldest first.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Whether no position is open.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Leverage applied to the next opened position.
    #[must_use]
    pub const fn leverage(&self) -> u32 {
        self.leverage
    }

    /// Margin mode applied to the next opened position.
    #[must_use]
    pub const fn margin_mode(&self) -> MarginMode {
        self.margin_mode
    }

    /// Set the leverage for future positions, clamped to `[1, 100]`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PositionOpen`] while a position is held.
    pub fn set_leverage(&mut self, leverage: u32) -> Result<(), LedgerError> {
        if self.position.is_some() {
            return Err(LedgerError::PositionOpen);
        }
        self.leverage = leverage.clamp(*LEVERAGE_RANGE.start(), *LEVERAGE_RANGE.end());
        Ok(())
    }

    /// Set the margin mode for future positions.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PositionOpen`] while a position is held.
    pub fn set_margin_mode(&mut self, mode: MarginMode) -> Result<(), LedgerError> {
        if self.position.is_some() {
            return Err(LedgerError::PositionOpen);
        }
        self.margin_mode = mode;
        Ok(())
    }

    /// Account equity at `mark_price`: free balance plus, when a position
    /// is open, its margin and unrealized P&L.
    #[must_use]
    pub fn equity(&self, mark_price: Decimal) -> Decimal {
        self.position.as_ref().map_or(self.balance, |pos| {
            self.balance + pos.margin + pos.unrealized_pnl(mark_price)
        })
    }

    /// Largest quantity the balance can open at `price` under the current
    /// leverage, fee included, truncated to 4 decimals.
    #[must_use]
    pub fn max_open_quantity(&self, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO || self.balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let leverage = Decimal::from(self.leverage);
        let max_margin = self.balance / (Decimal::ONE + leverage * TAKER_FEE_RATE);
        (max_margin * leverage / price).trunc_with_scale(4)
    }

    /// Open a position, or add to the existing same-side position.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidQuantity`] / [`LedgerError::InvalidPrice`] on
    /// non-positive inputs, [`LedgerError::OppositeSideBlocked`] when a
    /// position with the other side is open, and
    /// [`LedgerError::InsufficientMargin`] when the balance cannot cover
    /// margin plus fee. The ledger is unchanged on error.
    pub fn open(
        &mut self,
        side: Side,
        quantity: Decimal,
        mark_price: Decimal,
        entry_index: usize,
        timestamp_ms: i64,
    ) -> Result<OpenReceipt, LedgerError> {
        validate_order(quantity, mark_price)?;

        if let Some(pos) = &self.position {
            if pos.side != side {
                return Err(LedgerError::OppositeSideBlocked);
            }
            return self.add(quantity, mark_price, entry_index);
        }

        let margin = margin_required(mark_price, quantity, self.leverage);
        let fee = taker_fee(mark_price, quantity);
        self.check_affordable(margin, fee)?;

        // Available balance for the cross formula excludes the margin being
        // locked by this order.
        let available = self.balance - margin;
        let liq_price = liquidation_price(
            side,
            self.margin_mode,
            mark_price,
            quantity,
            self.leverage,
            margin,
            available,
        );

        self.balance -= margin + fee;
        self.position = Some(Position {
            side,
            total_quantity: quantity,
            avg_entry_price: mark_price,
            leverage: self.leverage,
            margin_mode: self.margin_mode,
            margin,
            liquidation_price: liq_price,
            entry_index,
            entry_timestamp_ms: timestamp_ms,
            fills: vec![EntryFill {
                quantity,
                price: mark_price,
            }],
        });

        info!(
            side = ?side,
            quantity = %quantity,
            price = %mark_price,
            margin = %margin,
            fee = %fee,
            liquidation_price = %liq_price,
            "Position opened"
        );

        Ok(OpenReceipt {
            margin_locked: margin,
            fee,
        })
    }

    /// Add to the open position. Leverage and margin mode are inherited;
    /// average entry, total margin, and liquidation price are recomputed
    /// from the new aggregates.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoPosition`] when flat, otherwise the same rejections
    /// as [`PositionLedger::open`].
    pub fn add(
        &mut self,
        quantity: Decimal,
        mark_price: Decimal,
        entry_index: usize,
    ) -> Result<OpenReceipt, LedgerError> {
        validate_order(quantity, mark_price)?;
        if self.position.is_none() {
            return Err(LedgerError::NoPosition);
        }

        let (leverage, side, mode) = {
            let pos = self.position.as_ref().ok_or(LedgerError::NoPosition)?;
            (pos.leverage, pos.side, pos.margin_mode)
        };

        let leg_margin = margin_required(mark_price, quantity, leverage);
        let fee = taker_fee(mark_price, quantity);
        self.check_affordable(leg_margin, fee)?;

        let available = self.balance - leg_margin;
        self.balance -= leg_margin + fee;

        let pos = self.position.as_mut().ok_or(LedgerError::NoPosition)?;
        let new_quantity = pos.total_quantity + quantity;
        let new_avg = weighted_average_entry(
            pos.avg_entry_price,
            pos.total_quantity,
            mark_price,
            quantity,
        );
        let new_margin = pos.margin + leg_margin;
        let liq_price = liquidation_price(
            side, mode, new_avg, new_quantity, leverage, new_margin, available,
        );

        pos.total_quantity = new_quantity;
        pos.avg_entry_price = new_avg;
        pos.margin = new_margin;
        pos.liquidation_price = liq_price;
        pos.entry_index = entry_index;
        pos.fills.push(EntryFill {
            quantity,
            price: mark_price,
        });

        info!(
            quantity = %quantity,
            price = %mark_price,
            total_quantity = %new_quantity,
            avg_entry_price = %new_avg,
            margin = %new_margin,
            liquidation_price = %liq_price,
            "Position increased"
        );

        Ok(OpenReceipt {
            margin_locked: leg_margin,
            fee,
        })
    }

    /// Close up to `quantity` of the open position at `mark_price`.
    ///
    /// The quantity is clamped to the open total. Margin is returned
    /// proportionally; when the remainder falls below the dust threshold
    /// the position is destroyed and its full remaining margin released,
    /// so no collateral residue survives rounding drift. A partial close
    /// leaves average entry and liquidation price unchanged.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoPosition`] when flat,
    /// [`LedgerError::InvalidQuantity`] / [`LedgerError::InvalidPrice`] on
    /// non-positive inputs.
    pub fn close(
        &mut self,
        quantity: Decimal,
        mark_price: Decimal,
        timestamp_ms: i64,
    ) -> Result<CloseReceipt, LedgerError> {
        validate_order(quantity, mark_price)?;
        let pos = self.position.as_ref().ok_or(LedgerError::NoPosition)?;

        let close_quantity = quantity.min(pos.total_quantity);
        let remaining = pos.total_quantity - close_quantity;
        let fully_closed = remaining < DUST_QUANTITY;

        let pnl = unrealized_pnl(pos.side, pos.avg_entry_price, mark_price, close_quantity);
        let fee = taker_fee(mark_price, close_quantity);
        let margin_returned = if fully_closed {
            pos.margin
        } else {
            pos.margin * close_quantity / pos.total_quantity
        };

        let balance_delta = margin_returned + pnl - fee;
        self.balance += balance_delta;

        let trade = Trade::from_exit(
            pos,
            close_quantity,
            mark_price,
            timestamp_ms,
            pnl,
            fee,
            self.balance,
            TradeStatus::Closed,
        );
        self.trades.push(trade.clone());

        if fully_closed {
            self.position = None;
        } else if let Some(pos) = self.position.as_mut() {
            pos.total_quantity = remaining;
            pos.margin -= margin_returned;
        }

        info!(
            quantity = %close_quantity,
            price = %mark_price,
            pnl = %pnl,
            fee = %fee,
            remaining = %remaining,
            balance = %self.balance,
            "Position closed"
        );

        Ok(CloseReceipt {
            trade,
            balance_delta,
            remaining_quantity: if fully_closed { Decimal::ZERO } else { remaining },
        })
    }

    /// Liquidate the open position at its stored liquidation price.
    ///
    /// Isolated mode forfeits the position margin and leaves the balance
    /// untouched; cross mode forfeits margin plus the whole balance, which
    /// is forced to exactly zero.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoPosition`] when flat.
    pub fn liquidate(&mut self, timestamp_ms: i64) -> Result<Trade, LedgerError> {
        let pos = self.position.as_ref().ok_or(LedgerError::NoPosition)?;

        let pnl = match pos.margin_mode {
            MarginMode::Isolated => -pos.margin,
            MarginMode::Cross => -(pos.margin + self.balance),
        };
        if pos.margin_mode == MarginMode::Cross {
            self.balance = Decimal::ZERO;
        }

        let trade = Trade::from_exit(
            pos,
            pos.total_quantity,
            pos.liquidation_price,
            timestamp_ms,
            pnl,
            Decimal::ZERO,
            self.balance,
            TradeStatus::Liquidation,
        );
        self.trades.push(trade.clone());

        info!(
            side = ?pos.side,
            margin_mode = ?pos.margin_mode,
            liquidation_price = %pos.liquidation_price,
            loss = %pnl,
            balance = %self.balance,
            "Position liquidated"
        );

        self.position = None;
        Ok(trade)
    }

    /// Settle the full remaining position at `mark_price` (end of round).
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoPosition`] when flat,
    /// [`LedgerError::InvalidPrice`] on a non-positive mark.
    pub fn settle(&mut self, mark_price: Decimal, timestamp_ms: i64) -> Result<Trade, LedgerError> {
        if mark_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice(mark_price));
        }
        let pos = self.position.as_ref().ok_or(LedgerError::NoPosition)?;

        let pnl = pos.unrealized_pnl(mark_price);
        let fee = taker_fee(mark_price, pos.total_quantity);
        self.balance += pos.margin + pnl - fee;

        let trade = Trade::from_exit(
            pos,
            pos.total_quantity,
            mark_price,
            timestamp_ms,
            pnl,
            fee,
            self.balance,
            TradeStatus::Closed,
        );
        self.trades.push(trade.clone());

        info!(
            price = %mark_price,
            pnl = %pnl,
            fee = %fee,
            balance = %self.balance,
            "Position settled at round end"
        );

        self.position = None;
        Ok(trade)
    }

    fn check_affordable(&self, margin: Decimal, fee: Decimal) -> Result<(), LedgerError> {
        let required = margin + fee;
        if self.balance < required {
            debug!(required = %required, available = %self.balance, "Order rejected");
            return Err(LedgerError::InsufficientMargin {
                required,
                available: self.balance,
            });
        }
        Ok(())
    }
}

fn validate_order(quantity: Decimal, mark_price: Decimal) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    if mark_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(mark_price));
    }
    Ok(())
}

/// Whether the balance can cover a dust-sized order (the smallest order the
/// panel allows) at `price` under `leverage`, fee included.
#[must_use]
pub fn can_afford_minimum_order(balance: Decimal, price: Decimal, leverage: u32) -> bool {
    if price <= Decimal::ZERO {
        return false;
    }
    let required =
        margin_required(price, DUST_QUANTITY, leverage) + taker_fee(price, DUST_QUANTITY);
    balance >= required
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    const TS: i64 = 1_577_836_800_000;

    fn ledger_10k() -> PositionLedger {
        let mut ledger = PositionLedger::new(dec!(10000));
        ledger.set_leverage(10).unwrap();
        ledger
    }

    fn assert_close(a: Decimal, b: Decimal) {
        assert!((a - b).abs() < dec!(0.0000000001), "{a} != {b}");
    }

    #[test]
    fn test_open_long_isolated_scenario() {
        let mut ledger = ledger_10k();
        let receipt = ledger.open(Side::Long, dec!(1), dec!(50000), 5, TS).unwrap();

        assert_eq!(receipt.margin_locked, dec!(5000));
        assert_eq!(receipt.fee, dec!(25));
        assert_eq!(ledger.balance(), dec!(4975));

        let pos = ledger.position().unwrap();
        assert_eq!(pos.avg_entry_price, dec!(50000));
        assert_eq!(pos.liquidation_price, dec!(45250));
        assert_eq!(pos.entry_index, 5);
        assert_eq!(pos.fills.len(), 1);
    }

    #[test]
    fn test_add_recomputes_aggregates_scenario() {
        let mut ledger = PositionLedger::new(dec!(20000));
        ledger.set_leverage(10).unwrap();
        ledger.open(Side::Long, dec!(1), dec!(50000), 1, TS).unwrap();
        ledger.open(Side::Long, dec!(1), dec!(60000), 2, TS).unwrap();

        let pos = ledger.position().unwrap();
        assert_eq!(pos.avg_entry_price, dec!(55000));
        assert_eq!(pos.margin, dec!(11000)); // 5000 + 6000
        // Isolated liquidation from the new average: 55000 * 0.905
        assert_eq!(pos.liquidation_price, dec!(49775));
        assert_eq!(pos.entry_index, 2);
        assert_eq!(pos.fills.len(), 2);
    }

    #[test]
    fn test_open_rejects_insufficient_margin() {
        let mut ledger = PositionLedger::new(dec!(100));
        let before = ledger.clone();
        let err = ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientMargin { .. }));
        assert_eq!(ledger.balance(), before.balance());
        assert!(ledger.is_flat());
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn test_open_rejects_opposite_side() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(0.1), dec!(50000), 0, TS).unwrap();
        let balance = ledger.balance();

        let err = ledger.open(Side::Short, dec!(0.1), dec!(50000), 1, TS).unwrap_err();
        assert_eq!(err, LedgerError::OppositeSideBlocked);
        assert_eq!(ledger.balance(), balance);
        assert_eq!(ledger.position().unwrap().side, Side::Long);
    }

    #[test]
    fn test_open_rejects_invalid_inputs() {
        let mut ledger = ledger_10k();
        assert!(matches!(
            ledger.open(Side::Long, dec!(0), dec!(50000), 0, TS),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(matches!(
            ledger.open(Side::Long, dec!(-1), dec!(50000), 0, TS),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(matches!(
            ledger.open(Side::Long, dec!(1), dec!(0), 0, TS),
            Err(LedgerError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_partial_close_returns_proportional_margin() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        let liq_before = ledger.position().unwrap().liquidation_price;

        let receipt = ledger.close(dec!(0.4), dec!(52000), TS).unwrap();

        // pnl = 2000 * 0.4 = 800, margin back = 2000, fee = 52000*0.4*0.0005
        assert_eq!(receipt.trade.pnl, dec!(800));
        assert_eq!(receipt.balance_delta, dec!(2000) + dec!(800) - dec!(10.4));
        assert_eq!(receipt.remaining_quantity, dec!(0.6));

        let pos = ledger.position().unwrap();
        assert_eq!(pos.total_quantity, dec!(0.6));
        assert_eq!(pos.margin, dec!(3000));
        assert_eq!(pos.avg_entry_price, dec!(50000));
        // Liquidation price is not recomputed on partial close.
        assert_eq!(pos.liquidation_price, liq_before);
    }

    #[test]
    fn test_close_clamps_to_open_quantity() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        let receipt = ledger.close(dec!(5), dec!(50000), TS).unwrap();

        assert_eq!(receipt.trade.quantity, dec!(1));
        assert!(ledger.is_flat());
    }

    #[test]
    fn test_dust_closure_releases_full_margin() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        let balance_before = ledger.balance();

        // Leaves 0.00005 < dust threshold: position must die and the whole
        // 5000 margin must come back, not the proportional 4999.75.
        let receipt = ledger.close(dec!(0.99995), dec!(50000), TS).unwrap();

        assert!(ledger.is_flat());
        assert_eq!(receipt.remaining_quantity, dec!(0));
        let fee = dec!(50000) * dec!(0.99995) * dec!(0.0005);
        assert_eq!(ledger.balance(), balance_before + dec!(5000) - fee);
    }

    #[test]
    fn test_close_while_flat_is_rejected() {
        let mut ledger = ledger_10k();
        assert_eq!(
            ledger.close(dec!(1), dec!(50000), TS).unwrap_err(),
            LedgerError::NoPosition
        );
    }

    #[test]
    fn test_liquidate_isolated_keeps_balance() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        let balance = ledger.balance();

        let trade = ledger.liquidate(TS).unwrap();

        assert_eq!(trade.status, TradeStatus::Liquidation);
        assert_eq!(trade.exit_price, dec!(45250));
        assert_eq!(trade.pnl, dec!(-5000));
        assert_eq!(ledger.balance(), balance);
        assert!(ledger.is_flat());
    }

    #[test]
    fn test_liquidate_cross_zeroes_balance() {
        let mut ledger = PositionLedger::new(dec!(10000));
        ledger.set_leverage(10).unwrap();
        ledger.set_margin_mode(MarginMode::Cross).unwrap();
        ledger.open(Side::Short, dec!(1), dec!(50000), 0, TS).unwrap();

        let trade = ledger.liquidate(TS).unwrap();

        assert_eq!(ledger.balance(), dec!(0));
        assert_eq!(trade.balance_after, dec!(0));
        assert_eq!(trade.pnl, -(dec!(5000) + dec!(4975)));
        assert!(ledger.is_flat());
    }

    #[test]
    fn test_settle_full_exit() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        let balance = ledger.balance();

        let trade = ledger.settle(dec!(51000), TS).unwrap();

        assert_eq!(trade.status, TradeStatus::Closed);
        let fee = dec!(51000) * dec!(0.0005);
        assert_eq!(ledger.balance(), balance + dec!(5000) + dec!(1000) - fee);
        assert!(ledger.is_flat());
        assert_eq!(ledger.trades().len(), 1);
    }

    #[test]
    fn test_settings_locked_while_position_open() {
        let mut ledger = ledger_10k();
        ledger.open(Side::Long, dec!(0.1), dec!(50000), 0, TS).unwrap();

        assert_eq!(ledger.set_leverage(20).unwrap_err(), LedgerError::PositionOpen);
        assert_eq!(
            ledger.set_margin_mode(MarginMode::Cross).unwrap_err(),
            LedgerError::PositionOpen
        );
        assert_eq!(ledger.leverage(), 10);
    }

    #[test]
    fn test_set_leverage_clamps_to_range() {
        let mut ledger = PositionLedger::new(dec!(1000));
        ledger.set_leverage(0).unwrap();
        assert_eq!(ledger.leverage(), 1);
        ledger.set_leverage(500).unwrap();
        assert_eq!(ledger.leverage(), 100);
    }

    #[test]
    fn test_max_open_quantity_is_affordable() {
        let ledger = ledger_10k();
        let quantity = ledger.max_open_quantity(dec!(50000));
        assert!(quantity > dec!(0));

        let margin = margin_required(dec!(50000), quantity, 10);
        let fee = taker_fee(dec!(50000), quantity);
        assert!(margin + fee <= ledger.balance());

        // Bumping the quantity by one tick must exceed the balance.
        let bumped = quantity + dec!(0.0001);
        let margin = margin_required(dec!(50000), bumped, 10);
        let fee = taker_fee(dec!(50000), bumped);
        assert!(margin + fee > ledger.balance());
    }

    #[test]
    fn test_equity_includes_margin_and_unrealized_pnl() {
        let mut ledger = ledger_10k();
        assert_eq!(ledger.equity(dec!(50000)), dec!(10000));

        ledger.open(Side::Long, dec!(1), dec!(50000), 0, TS).unwrap();
        // 4975 free + 5000 margin + 1000 unrealized
        assert_eq!(ledger.equity(dec!(51000)), dec!(10975));
    }

    #[test]
    fn test_can_afford_minimum_order() {
        assert!(can_afford_minimum_order(dec!(10), dec!(50000), 10));
        // Dust order at 50000 and 1x needs 5 margin + 0.0025 fee.
        assert!(!can_afford_minimum_order(dec!(4), dec!(50000), 1));
        assert!(!can_afford_minimum_order(dec!(10), dec!(0), 10));
    }

    #[test]
    fn test_margin_conservation_over_sequence() {
        let initial = dec!(10000);
        let mut ledger = PositionLedger::new(initial);
        ledger.set_leverage(10).unwrap();

        ledger.open(Side::Long, dec!(0.5), dec!(50000), 0, TS).unwrap();
        ledger.open(Side::Long, dec!(0.5), dec!(52000), 1, TS).unwrap();
        ledger.close(dec!(0.3), dec!(53000), TS).unwrap();
        ledger.close(dec!(0.7), dec!(49000), TS).unwrap();

        let realized: Decimal = ledger.trades().iter().map(|t| t.pnl).sum();
        let entry_fees = taker_fee(dec!(50000), dec!(0.5)) + taker_fee(dec!(52000), dec!(0.5));
        let exit_fees: Decimal = ledger.trades().iter().map(|t| t.fee).sum();

        assert_close(ledger.balance(), initial + realized - entry_fees - exit_fees);
        assert!(ledger.is_flat());
    }

    proptest! {
        /// Opening Q in one call vs two same-price adds must land on the
        /// same aggregates (within Decimal division headroom).
        #[test]
        fn prop_add_path_independence_isolated(
            price in 1_000u32..100_000,
            q1 in 1u32..500,
            q2 in 1u32..500,
            leverage in 1u32..=100,
        ) {
            let price = Decimal::from(price);
            let q1 = Decimal::new(i64::from(q1), 3);
            let q2 = Decimal::new(i64::from(q2), 3);

            let mut split = PositionLedger::new(dec!(100000000));
            split.set_leverage(leverage).unwrap();
            split.open(Side::Long, q1, price, 0, TS).unwrap();
            split.open(Side::Long, q2, price, 0, TS).unwrap();

            let mut single = PositionLedger::new(dec!(100000000));
            single.set_leverage(leverage).unwrap();
            single.open(Side::Long, q1 + q2, price, 0, TS).unwrap();

            let a = split.position().unwrap();
            let b = single.position().unwrap();
            assert_close(a.avg_entry_price, b.avg_entry_price);
            assert_close(a.margin, b.margin);
            assert_close(a.liquidation_price, b.liquidation_price);
        }

        /// balance + locked margin only ever moves by pnl - fees.
        #[test]
        fn prop_margin_conservation(
            entry in 10_000u32..80_000,
            exit in 10_000u32..80_000,
            quantity in 1u32..2_000,
            leverage in 1u32..=100,
        ) {
            let entry = Decimal::from(entry);
            let exit = Decimal::from(exit);
            let quantity = Decimal::new(i64::from(quantity), 3);
            let initial = dec!(100000000);

            let mut ledger = PositionLedger::new(initial);
            ledger.set_leverage(leverage).unwrap();
            ledger.open(Side::Long, quantity, entry, 0, TS).unwrap();
            ledger.close(quantity, exit, TS).unwrap();

            let pnl = (exit - entry) * quantity;
            let fees = taker_fee(entry, quantity) + taker_fee(exit, quantity);
            assert_close(ledger.balance(), initial + pnl - fees);
        }
    }
}
