//! Round controller: wires the replay clock to the position ledger.
//!
//! One tick runs the transition handlers in a fixed order: candle advance,
//! liquidation check, settlement check, starvation check. All mutation is
//! synchronous; the async [`SimulationController::play`] loop is only a
//! timer that schedules ticks.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::candle::{Candle, CandleSeries, SeriesError};
use super::config::RoundConfig;
use super::ledger::{
    CloseReceipt, LedgerError, OpenReceipt, PositionLedger, can_afford_minimum_order,
};
use super::logging::{log_liquidation, log_round_end, log_round_start};
use super::position::{MarginMode, Side};
use super::replay::{Advance, ReplayClock};
use super::result::{DrawdownTracker, RoundResult};
use super::trade::Trade;

/// Outcome of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// The clock was not playing (or the round is already over).
    Idle,
    /// The cursor advanced; nothing terminal happened.
    Advanced,
    /// The open position was liquidated on this tick.
    Liquidated,
    /// The round ended; the result is available exactly once.
    RoundEnded,
}

/// Drives one full trading round over a candle series.
#[derive(Debug)]
pub struct SimulationController {
    config: RoundConfig,
    series: CandleSeries,
    clock: ReplayClock,
    ledger: PositionLedger,
    drawdown: DrawdownTracker,
    ended: bool,
    result: Option<RoundResult>,
}

impl SimulationController {
    /// Create a controller for one round.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::StartIndexOutOfRange`] when the configured
    /// start index does not exist in the series.
    pub fn new(config: RoundConfig, series: CandleSeries) -> Result<Self, SeriesError> {
        if config.start_index >= series.len() {
            return Err(SeriesError::StartIndexOutOfRange {
                start_index: config.start_index,
                len: series.len(),
            });
        }

        log_round_start(&config);

        let clock = ReplayClock::new(config.start_index, config.trading_period);
        let ledger = PositionLedger::new(config.initial_balance);
        let drawdown = DrawdownTracker::new(config.initial_balance);
        Ok(Self {
            config,
            series,
            clock,
            ledger,
            drawdown,
            ended: false,
            result: None,
        })
    }

    /// Round configuration.
    #[must_use]
    pub const fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// The replay clock.
    #[must_use]
    pub const fn clock(&self) -> &ReplayClock {
        &self.clock
    }

    /// The position ledger.
    #[must_use]
    pub const fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Whether the round has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Terminal result, present once the round has ended.
    #[must_use]
    pub const fn result(&self) -> Option<&RoundResult> {
        self.result.as_ref()
    }

    /// Candle at the current cursor.
    #[must_use]
    pub fn current_candle(&self) -> &Candle {
        // The cursor is bounds-checked at construction and on every
        // advance, so the index is always valid.
        &self.series.candles()[self.clock.current_index().min(self.series.last_index())]
    }

    /// Tradable mark price: the current close, while it is valid and the
    /// round is live. `None` freezes trading actions but not the clock's
    /// display.
    #[must_use]
    pub fn mark_price(&self) -> Option<Decimal> {
        if self.ended {
            return None;
        }
        let close = self.current_candle().close;
        (close > Decimal::ZERO).then_some(close)
    }

    /// Open a position (or add to the same-side position) at the mark.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidPrice`] while no valid mark exists, otherwise
    /// the ledger's own rejections.
    pub fn open_position(
        &mut self,
        side: Side,
        quantity: Decimal,
    ) -> Result<OpenReceipt, LedgerError> {
        let price = self.mark_price().ok_or(LedgerError::InvalidPrice(Decimal::ZERO))?;
        let index = self.clock.current_index();
        let timestamp_ms = self.current_candle().timestamp_ms;
        self.ledger.open(side, quantity, price, index, timestamp_ms)
    }

    /// Close up to `quantity` of the open position at the mark.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidPrice`] while no valid mark exists, otherwise
    /// the ledger's own rejections.
    pub fn close_position(&mut self, quantity: Decimal) -> Result<CloseReceipt, LedgerError> {
        let price = self.mark_price().ok_or(LedgerError::InvalidPrice(Decimal::ZERO))?;
        let timestamp_ms = self.current_candle().timestamp_ms;
        self.ledger.close(quantity, price, timestamp_ms)
    }

    /// Set the leverage for the next position (rejected while one is open).
    ///
    /// # Errors
    ///
    /// [`LedgerError::PositionOpen`] while a position is held.
    pub fn set_leverage(&mut self, leverage: u32) -> Result<(), LedgerError> {
        self.ledger.set_leverage(leverage)
    }

    /// Set the margin mode for the next position (rejected while one is
    /// open).
    ///
    /// # Errors
    ///
    /// [`LedgerError::PositionOpen`] while a position is held.
    pub fn set_margin_mode(&mut self, mode: MarginMode) -> Result<(), LedgerError> {
        self.ledger.set_margin_mode(mode)
    }

    /// Flip between playing and paused. Playback starts only while the
    /// round is live and the cursor sits on a valid price.
    pub fn toggle_play(&mut self) {
        let can_play = !self.ended && self.mark_price().is_some();
        self.clock.toggle_play(can_play);
    }

    /// Set the playback speed (clamped to the supported range).
    pub fn set_playback_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    /// Run one tick: advance the cursor, then apply the transition
    /// handlers in order (liquidation, settlement, starvation).
    pub fn tick(&mut self) -> TickEvent {
        if self.ended {
            return TickEvent::Idle;
        }

        match self.clock.advance(self.series.len()) {
            Advance::NotPlaying => TickEvent::Idle,
            Advance::PeriodEnd | Advance::DataEnd => {
                self.end_round();
                TickEvent::RoundEnded
            }
            Advance::Stepped(index) => {
                debug!(index, "Cursor advanced");
                let liquidated = self.check_liquidation().is_some();

                if self.clock.remaining_candles() == 0 {
                    self.end_round();
                    return TickEvent::RoundEnded;
                }

                if self.is_starved() {
                    info!(balance = %self.ledger.balance(), "Balance starved, ending round early");
                    self.end_round();
                    return TickEvent::RoundEnded;
                }

                let close = self.current_candle().close;
                self.drawdown.observe(self.ledger.equity(close));

                if liquidated {
                    TickEvent::Liquidated
                } else {
                    TickEvent::Advanced
                }
            }
        }
    }

    /// Check the open position against the current candle's intrabar
    /// extremes and liquidate on a hit. Skipped on the candle the position
    /// (or its latest leg) was entered on, so the entry candle's own wick
    /// cannot instantly liquidate it.
    ///
    /// Invoked on every tick; embedders reacting to position changes may
    /// also call it directly.
    pub fn check_liquidation(&mut self) -> Option<Trade> {
        let index = self.clock.current_index();
        let candle = self.current_candle();
        let pos = self.ledger.position()?;
        if pos.entry_index == index {
            return None;
        }

        let hit = match pos.side {
            Side::Long => candle.traded_below(pos.liquidation_price),
            Side::Short => candle.traded_above(pos.liquidation_price),
        };
        if !hit {
            return None;
        }

        let timestamp_ms = candle.timestamp_ms;
        match self.ledger.liquidate(timestamp_ms) {
            Ok(trade) => {
                log_liquidation(&trade);
                Some(trade)
            }
            Err(err) => {
                // Unreachable: the position was just observed.
                warn!(error = %err, "Liquidation failed");
                None
            }
        }
    }

    /// While flat: can the balance still afford the smallest order the
    /// panel allows (dust quantity at the mark, current leverage, fee
    /// included)? When it cannot, the round is over for the player.
    fn is_starved(&self) -> bool {
        if !self.ledger.is_flat() {
            return false;
        }
        let close = self.current_candle().close;
        !can_afford_minimum_order(self.ledger.balance(), close, self.ledger.leverage())
    }

    /// Settle and emit the terminal result. One-shot: every later call is
    /// a no-op, so settlement can never fire twice.
    fn end_round(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let candle = self.current_candle().clone();
        if self.ledger.position().is_some() {
            if let Err(err) = self.ledger.settle(candle.close, candle.timestamp_ms) {
                warn!(error = %err, "Settlement failed; position carried into result");
            }
        }
        self.clock.end();
        self.drawdown.observe(self.ledger.balance());

        let trades = self.ledger.trades().to_vec();
        let (winning_trades, win_rate_pct) = RoundResult::win_stats(&trades);
        let end_index = (self.config.start_index + self.config.trading_period - 1)
            .min(self.series.last_index());

        let result = RoundResult {
            initial_balance: self.config.initial_balance,
            final_balance: self.ledger.balance(),
            total_return_pct: RoundResult::total_return_pct(
                self.config.initial_balance,
                self.ledger.balance(),
            ),
            total_trades: trades.len() as u64,
            winning_trades,
            win_rate_pct,
            max_drawdown_pct: self.drawdown.max_drawdown_pct(),
            trades,
            trading_start_time: self.series.candles()[self.config.start_index]
                .timestamp_rfc3339(),
            trading_end_time: self.series.candles()[end_index].timestamp_rfc3339(),
            coin_symbol: self.config.coin_symbol.clone(),
            timeframe: self.config.timeframe,
        };

        log_round_end(&result);
        self.result = Some(result);
    }

    /// Cooperative pacing loop: while playing, sleep one tick interval and
    /// run [`SimulationController::tick`]. Returns when playback pauses or
    /// the round ends.
    pub async fn play(&mut self) -> Option<&RoundResult> {
        while self.clock.is_playing() {
            tokio::time::sleep(self.clock.tick_interval()).await;
            if self.tick() == TickEvent::RoundEnded {
                break;
            }
        }
        self.result.as_ref()
    }
}
