//! Stepped replay clock over a candle series.
//!
//! The clock owns the index cursor and playback state; it never touches
//! account state. A single timer source drives [`ReplayClock::advance`]
//! while playing — all other transitions are direct calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum playback speed multiplier.
pub const MIN_PLAYBACK_SPEED: f64 = 0.1;

/// Maximum playback speed multiplier.
pub const MAX_PLAYBACK_SPEED: f64 = 3.0;

/// Base tick cadence at 1.0x speed (presentation-rate constant).
pub const BASE_TICK_INTERVAL_MS: u64 = 120;

/// Playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Before trading starts; browsing history at the cursor.
    Idle,
    /// Timer is advancing the cursor.
    Playing,
    /// Advancement suspended; state is retained.
    Paused,
    /// Round over; the clock no longer reacts to toggles.
    Ended,
}

/// Outcome of one clock advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Cursor moved to this index.
    Stepped(usize),
    /// The trading period is exhausted; the clock paused itself.
    PeriodEnd,
    /// The candle series ran out before the period did; clock paused.
    DataEnd,
    /// The clock was not playing; nothing happened.
    NotPlaying,
}

/// Index cursor plus playback state over a candle series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayClock {
    current_index: usize,
    start_index: usize,
    trading_period: usize,
    state: PlaybackState,
    playback_speed: f64,
}

impl ReplayClock {
    /// Create a clock positioned one candle before the first tradable
    /// index, in the `Idle` state.
    #[must_use]
    pub fn new(start_index: usize, trading_period: usize) -> Self {
        Self {
            current_index: start_index.saturating_sub(1),
            start_index,
            trading_period,
            state: PlaybackState::Idle,
            playback_speed: 1.0,
        }
    }

    /// Current cursor position.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// First tradable candle index.
    #[must_use]
    pub const fn start_index(&self) -> usize {
        self.start_index
    }

    /// Number of candles in the trading period.
    #[must_use]
    pub const fn trading_period(&self) -> usize {
        self.trading_period
    }

    /// Current playback state.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the timer should be advancing the cursor.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Current playback speed multiplier.
    #[must_use]
    pub const fn playback_speed(&self) -> f64 {
        self.playback_speed
    }

    /// Set the playback speed, clamped to `[0.1, 3.0]`.
    pub fn set_speed(&mut self, speed: f64) {
        self.playback_speed = if speed.is_finite() {
            speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
        } else {
            1.0
        };
    }

    /// Wall-clock delay between advances at the current speed.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(BASE_TICK_INTERVAL_MS as f64 / 1000.0 / self.playback_speed)
    }

    /// Flip between playing and paused. The single idempotent entry point
    /// UI layers bind to (button and keyboard alike).
    ///
    /// `can_play` gates the transition into `Playing`: the caller confirms
    /// that data exists at the cursor and the current price is valid.
    /// Ignored once the round has ended.
    pub fn toggle_play(&mut self, can_play: bool) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Idle | PlaybackState::Paused if can_play => PlaybackState::Playing,
            other => other,
        };
        debug!(state = ?self.state, "Playback toggled");
        self.state
    }

    /// Suspend playback. No-op unless currently playing.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Mark the round as over; the clock stops reacting to toggles.
    pub fn end(&mut self) {
        self.state = PlaybackState::Ended;
    }

    /// Advance the cursor by one candle while playing.
    ///
    /// Reaching the end of the trading period or of the data pauses the
    /// clock and reports the boundary instead of stepping.
    pub fn advance(&mut self, series_len: usize) -> Advance {
        if self.state != PlaybackState::Playing {
            return Advance::NotPlaying;
        }

        let next = self.current_index + 1;
        if next >= self.start_index + self.trading_period {
            self.state = PlaybackState::Paused;
            return Advance::PeriodEnd;
        }
        if next >= series_len {
            self.state = PlaybackState::Paused;
            return Advance::DataEnd;
        }

        self.current_index = next;
        Advance::Stepped(next)
    }

    /// Candles consumed from the trading period so far.
    #[must_use]
    pub const fn progress_candles(&self) -> usize {
        if self.current_index + 1 > self.start_index {
            self.current_index + 1 - self.start_index
        } else {
            0
        }
    }

    /// Candles left in the trading period.
    #[must_use]
    pub const fn remaining_candles(&self) -> usize {
        self.trading_period.saturating_sub(self.progress_candles())
    }

    /// Trading-period progress in percent.
    #[must_use]
    pub fn progress_pct(&self) -> f64 {
        if self.trading_period == 0 {
            return 0.0;
        }
        self.progress_candles() as f64 / self.trading_period as f64 * 100.0
    }
}
