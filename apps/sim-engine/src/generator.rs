//! Deterministic synthetic candle series for demos and tests.
//!
//! Random-walk OHLCV generation with per-symbol price profiles. Live
//! market data stays an external concern; this module only feeds the
//! replay engine when no real series is supplied.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::candle::{Candle, CandleSeries, SeriesError};
use super::config::Timeframe;

/// Price characteristics of a generated symbol.
#[derive(Debug, Clone, Copy)]
struct SymbolProfile {
    base_price: f64,
    base_price_jitter: f64,
    volatility: f64,
    trend: f64,
    decimals: u32,
}

fn profile(symbol: &str) -> SymbolProfile {
    match symbol {
        "ETH" => SymbolProfile {
            base_price: 2500.0,
            base_price_jitter: 1000.0,
            volatility: 0.025,
            trend: 0.0012,
            decimals: 2,
        },
        "BNB" => SymbolProfile {
            base_price: 300.0,
            base_price_jitter: 100.0,
            volatility: 0.03,
            trend: 0.0008,
            decimals: 2,
        },
        "ADA" => SymbolProfile {
            base_price: 0.5,
            base_price_jitter: 0.3,
            volatility: 0.035,
            trend: 0.0015,
            decimals: 4,
        },
        // BTC profile doubles as the fallback.
        _ => SymbolProfile {
            base_price: 45000.0,
            base_price_jitter: 10000.0,
            volatility: 0.02,
            trend: 0.001,
            decimals: 2,
        },
    }
}

fn to_price(value: f64, decimals: u32) -> Decimal {
    Decimal::from_f64(value).map_or(Decimal::ZERO, |d| d.round_dp(decimals))
}

/// Generate a seeded random-walk candle series.
///
/// Candles are spaced by the timeframe starting at `start_timestamp_ms`.
/// The same seed always produces the same series.
///
/// # Errors
///
/// Returns [`SeriesError::Empty`] when `count` is zero.
pub fn generate_series(
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
    start_timestamp_ms: i64,
    seed: u64,
) -> Result<CandleSeries, SeriesError> {
    let profile = profile(symbol);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut price = profile.base_price + rng.random::<f64>() * profile.base_price_jitter;
    let mut candles = Vec::with_capacity(count);

    for i in 0..count {
        let trend = (i as f64 / 100.0).sin() * profile.trend;
        let change = (rng.random::<f64>() - 0.5) * profile.volatility;
        let new_price = price * (1.0 + trend + change);

        let open = price;
        let close = new_price;
        let high = open.max(close) * (1.0 + rng.random::<f64>() * 0.01);
        let low = open.min(close) * (1.0 - rng.random::<f64>() * 0.01);
        let volume = rng.random_range(100_000..1_100_000u64);

        candles.push(Candle::new(
            start_timestamp_ms + i as i64 * timeframe.duration_ms(),
            to_price(open, profile.decimals),
            to_price(high, profile.decimals),
            to_price(low, profile.decimals),
            to_price(close, profile.decimals),
            Decimal::from(volume),
        ));

        price = new_price;
    }

    CandleSeries::new(candles)
}
