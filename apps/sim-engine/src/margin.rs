//! Margin, fee, and liquidation price calculations.
//!
//! Pure functions shared by the position ledger and the round controller.
//! All math runs on [`Decimal`]; leverage is an integer multiplier fixed
//! for the lifetime of a position.

use rust_decimal::Decimal;

use super::position::{MarginMode, Side};

/// Taker fee rate applied to every fill, including liquidation settlement.
pub const TAKER_FEE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 4); // 0.0005

/// Maintenance margin ratio used for isolated liquidation prices.
pub const MAINTENANCE_MARGIN_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 3); // 0.005

/// Quantity below which a position is considered fully closed.
pub const DUST_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 4); // 0.0001

/// Collateral required to hold `quantity` at `price` under `leverage`.
#[must_use]
pub fn margin_required(price: Decimal, quantity: Decimal, leverage: u32) -> Decimal {
    price * quantity / Decimal::from(leverage)
}

/// Taker fee for a fill of `quantity` at `price`.
#[must_use]
pub fn taker_fee(price: Decimal, quantity: Decimal) -> Decimal {
    price * quantity * TAKER_FEE_RATE
}

/// Liquidation price for a position's current aggregate state.
///
/// `available_balance` is the account balance at the time of computation,
/// excluding the margin being locked by the order under evaluation. It is
/// only consulted in cross mode; isolated liquidation depends on the entry
/// price and leverage alone.
///
/// On adds this is always recomputed from the new aggregates (average
/// entry, total margin, current available balance), never incrementally
/// adjusted, so repeated adds are path-independent given the same final
/// aggregate state.
#[must_use]
pub fn liquidation_price(
    side: Side,
    mode: MarginMode,
    entry_price: Decimal,
    quantity: Decimal,
    leverage: u32,
    margin: Decimal,
    available_balance: Decimal,
) -> Decimal {
    match mode {
        MarginMode::Isolated => {
            let inverse_leverage = Decimal::ONE / Decimal::from(leverage);
            match side {
                Side::Long => {
                    entry_price * (Decimal::ONE - inverse_leverage + MAINTENANCE_MARGIN_RATIO)
                }
                Side::Short => {
                    entry_price * (Decimal::ONE + inverse_leverage - MAINTENANCE_MARGIN_RATIO)
                }
            }
        }
        MarginMode::Cross => {
            let buffer = (margin + available_balance) / quantity;
            match side {
                Side::Long => entry_price - buffer,
                Side::Short => entry_price + buffer,
            }
        }
    }
}

/// Unrealized P&L of `quantity` entered at `entry_price`, marked at
/// `mark_price`.
#[must_use]
pub fn unrealized_pnl(
    side: Side,
    entry_price: Decimal,
    mark_price: Decimal,
    quantity: Decimal,
) -> Decimal {
    match side {
        Side::Long => (mark_price - entry_price) * quantity,
        Side::Short => (entry_price - mark_price) * quantity,
    }
}

/// Volume-weighted average entry price after adding a fill.
#[must_use]
pub fn weighted_average_entry(
    old_avg: Decimal,
    old_quantity: Decimal,
    fill_price: Decimal,
    fill_quantity: Decimal,
) -> Decimal {
    (old_avg * old_quantity + fill_price * fill_quantity) / (old_quantity + fill_quantity)
}
