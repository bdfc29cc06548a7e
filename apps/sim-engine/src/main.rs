//! Sim Engine Binary
//!
//! Runs one scripted trading round over a synthetic candle series and
//! prints the settled result as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sim-engine
//! ```
//!
//! # Environment Variables
//!
//! - `SIM_SYMBOL`: Coin symbol, BTC | ETH | BNB | ADA (default: BTC)
//! - `SIM_TIMEFRAME`: Candle timeframe label, e.g. 4h (default: 4h)
//! - `SIM_BALANCE`: Initial balance in USD (default: 10000)
//! - `SIM_PERIOD`: Candles to trade (default: 120)
//! - `SIM_HISTORY`: History candles before the trading window (default: 200)
//! - `SIM_LEVERAGE`: Leverage multiplier 1-100 (default: 10)
//! - `SIM_MARGIN_MODE`: isolated | cross (default: isolated)
//! - `SIM_SPEED`: Playback speed 0.1-3.0 (default: 3.0)
//! - `SIM_SEED`: Series generation seed (default: 20200101)
//! - `RUST_LOG`: Log level (default: info)

use std::str::FromStr;

use anyhow::{Context, anyhow};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sim_engine::{
    MarginMode, RoundConfig, Side, SimulationController, TickEvent, Timeframe, generate_series,
    log_action_rejected,
};
use tracing_subscriber::EnvFilter;

/// Parsed configuration from environment variables.
struct DemoConfig {
    symbol: String,
    timeframe: Timeframe,
    initial_balance: Decimal,
    trading_period: usize,
    history_candles: usize,
    leverage: u32,
    margin_mode: MarginMode,
    playback_speed: f64,
    seed: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}")),
        Err(_) => Ok(default),
    }
}

fn parse_config() -> anyhow::Result<DemoConfig> {
    let timeframe_label = std::env::var("SIM_TIMEFRAME").unwrap_or_else(|_| "4h".to_string());
    let timeframe = Timeframe::from_label(&timeframe_label)
        .ok_or_else(|| anyhow!("unknown SIM_TIMEFRAME: {timeframe_label}"))?;

    let margin_mode = match std::env::var("SIM_MARGIN_MODE")
        .unwrap_or_else(|_| "isolated".to_string())
        .to_lowercase()
        .as_str()
    {
        "isolated" => MarginMode::Isolated,
        "cross" => MarginMode::Cross,
        other => return Err(anyhow!("unknown SIM_MARGIN_MODE: {other}")),
    };

    Ok(DemoConfig {
        symbol: env_or("SIM_SYMBOL", "BTC".to_string())?,
        timeframe,
        initial_balance: env_or("SIM_BALANCE", dec!(10000))?,
        trading_period: env_or("SIM_PERIOD", 120)?,
        history_candles: env_or("SIM_HISTORY", 200)?,
        leverage: env_or("SIM_LEVERAGE", 10)?,
        margin_mode,
        playback_speed: env_or("SIM_SPEED", 3.0)?,
        seed: env_or("SIM_SEED", 20_200_101)?,
    })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Run `count` ticks, stopping early when the round ends.
fn run_ticks(round: &mut SimulationController, count: usize) {
    for _ in 0..count {
        if round.tick() == TickEvent::RoundEnded {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting sim-engine demo round");

    let demo = parse_config()?;
    let total_candles = demo.history_candles + demo.trading_period;
    let series = generate_series(&demo.symbol, demo.timeframe, total_candles, 0, demo.seed)?;

    let config = RoundConfig {
        coin_symbol: demo.symbol.clone(),
        timeframe: demo.timeframe,
        initial_balance: demo.initial_balance,
        start_index: demo.history_candles,
        trading_period: demo.trading_period,
    };
    let mut round = SimulationController::new(config, series)?;
    round.set_leverage(demo.leverage)?;
    round.set_margin_mode(demo.margin_mode)?;
    round.set_playback_speed(demo.playback_speed);

    // Scripted session: enter with 30% of the affordable size, hold for a
    // stretch, take half off, then let the round play out.
    round.toggle_play();
    run_ticks(&mut round, 10);

    if let Some(price) = round.mark_price() {
        let quantity =
            (round.ledger().max_open_quantity(price) * dec!(0.3)).trunc_with_scale(4);
        match round.open_position(Side::Long, quantity) {
            Ok(receipt) => tracing::info!(
                quantity = %quantity,
                margin = %receipt.margin_locked,
                fee = %receipt.fee,
                "Demo entry filled"
            ),
            Err(err) => log_action_rejected("open_position", &err),
        }
    }

    run_ticks(&mut round, 30);

    let open_quantity = round.ledger().position().map(|p| p.total_quantity);
    if !round.is_ended()
        && let Some(quantity) = open_quantity
    {
        let half = (quantity / dec!(2)).round_dp(4);
        match round.close_position(half) {
            Ok(receipt) => tracing::info!(
                quantity = %receipt.trade.quantity,
                pnl = %receipt.trade.pnl,
                "Demo partial close filled"
            ),
            Err(err) => log_action_rejected("close_position", &err),
        }
    }

    round.play().await;

    let result = round.result().context("round ended without a result")?;
    println!("{}", serde_json::to_string_pretty(result)?);

    Ok(())
}
