// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Sim Engine - Leveraged-Futures Replay Simulator
//!
//! Core engine for a leveraged-futures paper trading game driven by
//! historical candlestick replay:
//!
//! - **Margin & liquidation**: pure isolated/cross margin math with a
//!   fixed taker fee and maintenance margin ratio
//! - **Position ledger**: open / add / partial close / liquidate / settle
//!   transitions over a single-position account
//! - **Replay clock**: stepped index cursor with playback speed control
//! - **Round controller**: per-tick liquidation, settlement, and
//!   starvation checks, emitting one terminal result per round
//!
//! The engine is single-threaded and event-driven: the only asynchronous
//! element is the pacing timer that schedules ticks. Chart rendering,
//! market data fetching, and preference persistence are external
//! collaborators feeding plain inputs in.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use sim_engine::{
//!     RoundConfig, Side, SimulationController, TickEvent, generate_series,
//! };
//!
//! let config = RoundConfig {
//!     start_index: 100,
//!     trading_period: 50,
//!     ..RoundConfig::default()
//! };
//! let series = generate_series("BTC", config.timeframe, 200, 0, 42).unwrap();
//! let mut round = SimulationController::new(config, series).unwrap();
//!
//! round.set_leverage(10).unwrap();
//! round.open_position(Side::Long, dec!(0.01)).unwrap();
//! round.toggle_play();
//! while round.tick() != TickEvent::RoundEnded {}
//!
//! let result = round.result().unwrap();
//! assert_eq!(result.initial_balance, dec!(10000));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// OHLCV candles and the validated replay series.
pub mod candle;

/// Round configuration and timeframes.
pub mod config;

/// Round controller driving clock, ledger, and settlement.
pub mod controller;

/// Synthetic candle series generation.
pub mod generator;

/// Position ledger: balance, position, and trade history.
pub mod ledger;

/// Structured round lifecycle logging.
pub mod logging;

/// Margin, fee, and liquidation price math.
pub mod margin;

/// Open position state.
pub mod position;

/// Stepped replay clock.
pub mod replay;

/// Terminal round result and drawdown tracking.
pub mod result;

/// Closed-trade records.
pub mod trade;

pub use candle::{Candle, CandleSeries, SeriesError};
pub use config::{RoundConfig, Timeframe};
pub use controller::{SimulationController, TickEvent};
pub use generator::generate_series;
pub use ledger::{
    CloseReceipt, LedgerError, OpenReceipt, PositionLedger, can_afford_minimum_order,
};
pub use logging::{
    ActionRejectedEvent, LiquidationEvent, RoundEndEvent, RoundEvent, RoundStartEvent,
    create_liquidation_event, create_round_start_event, log_action_rejected, log_liquidation,
    log_round_end, log_round_start,
};
pub use margin::{
    DUST_QUANTITY, MAINTENANCE_MARGIN_RATIO, TAKER_FEE_RATE, liquidation_price, margin_required,
    taker_fee, unrealized_pnl, weighted_average_entry,
};
pub use position::{EntryFill, MarginMode, Position, Side};
pub use replay::{Advance, PlaybackState, ReplayClock};
pub use result::{DrawdownTracker, RoundResult};
pub use trade::{Trade, TradeStatus};
