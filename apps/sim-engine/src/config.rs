//! Round configuration types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Symbol whose prices are displayed with 4 decimals instead of 2.
const LOW_VALUE_SYMBOL: &str = "ADA";

/// Candle timeframe of the replayed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1 minute.
    #[serde(rename = "1m")]
    M1,
    /// 5 minutes.
    #[serde(rename = "5m")]
    M5,
    /// 15 minutes.
    #[serde(rename = "15m")]
    M15,
    /// 30 minutes.
    #[serde(rename = "30m")]
    M30,
    /// 1 hour.
    #[serde(rename = "1h")]
    H1,
    /// 4 hours.
    #[default]
    #[serde(rename = "4h")]
    H4,
    /// 8 hours.
    #[serde(rename = "8h")]
    H8,
    /// 1 day.
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Candle duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> i64 {
        const MINUTE: i64 = 60 * 1000;
        match self {
            Self::M1 => MINUTE,
            Self::M5 => 5 * MINUTE,
            Self::M15 => 15 * MINUTE,
            Self::M30 => 30 * MINUTE,
            Self::H1 => 60 * MINUTE,
            Self::H4 => 4 * 60 * MINUTE,
            Self::H8 => 8 * 60 * MINUTE,
            Self::D1 => 24 * 60 * MINUTE,
        }
    }

    /// Short label for display ("4h", "1d", ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::H8 => "8h",
            Self::D1 => "1d",
        }
    }

    /// Parse a short label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "1m" => Some(Self::M1),
            "5m" => Some(Self::M5),
            "15m" => Some(Self::M15),
            "30m" => Some(Self::M30),
            "1h" => Some(Self::H1),
            "4h" => Some(Self::H4),
            "8h" => Some(Self::H8),
            "1d" => Some(Self::D1),
            _ => None,
        }
    }

    /// Approximate wall-clock span covered by `candle_count` candles, for
    /// display ("~3 hours", "~21 days", ...).
    #[must_use]
    pub fn estimated_period(self, candle_count: usize) -> String {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        let total_ms = self.duration_ms() * candle_count as i64;
        let days = (total_ms + DAY_MS / 2) / DAY_MS;

        if days < 1 {
            let hours = (total_ms + 1_800_000) / 3_600_000;
            format!("~{hours} hours")
        } else if days < 30 {
            format!("~{days} days")
        } else if days < 365 {
            format!("~{} months", (days + 15) / 30)
        } else {
            format!("~{} years", (days + 182) / 365)
        }
    }
}

/// Configuration for one trading round, passed into the controller at
/// round start. Replaces any notion of ambient/global preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Coin symbol (display only; never feeds numeric paths).
    pub coin_symbol: String,
    /// Candle timeframe of the series (display only).
    pub timeframe: Timeframe,
    /// Starting account balance, USD.
    pub initial_balance: Decimal,
    /// First tradable candle index (history before it is chart context).
    pub start_index: usize,
    /// Number of candles to trade.
    pub trading_period: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            coin_symbol: "BTC".to_string(),
            timeframe: Timeframe::H4,
            initial_balance: Decimal::from(10_000),
            start_index: 1000,
            trading_period: 500,
        }
    }
}

impl RoundConfig {
    /// Display decimals for prices of this round's symbol: 4 for the
    /// designated low-value asset, 2 otherwise. A formatting hint only.
    #[must_use]
    pub fn price_decimals(&self) -> u32 {
        if self.coin_symbol == LOW_VALUE_SYMBOL {
            4
        } else {
            2
        }
    }

    /// Format a price for display with the symbol's decimals.
    #[must_use]
    pub fn format_price(&self, price: Decimal) -> String {
        format!("${}", price.round_dp(self.price_decimals()))
    }
}
