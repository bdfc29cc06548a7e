//! End-to-end round flow tests: scripted actions against the controller,
//! from construction to the settled result.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sim_engine::{
    Candle, CandleSeries, RoundConfig, Side, SimulationController, TickEvent, TradeStatus,
};

const HOUR_MS: i64 = 3_600_000;

fn candle(i: usize, open: i64, high: i64, low: i64, close: i64) -> Candle {
    Candle::new(
        i as i64 * HOUR_MS,
        Decimal::from(open),
        Decimal::from(high),
        Decimal::from(low),
        Decimal::from(close),
        dec!(1000),
    )
}

fn flat_series(len: usize) -> CandleSeries {
    CandleSeries::new(
        (0..len)
            .map(|i| candle(i, 50000, 50050, 49950, 50000))
            .collect(),
    )
    .unwrap()
}

fn round(series: CandleSeries, start: usize, period: usize) -> SimulationController {
    let config = RoundConfig {
        start_index: start,
        trading_period: period,
        ..RoundConfig::default()
    };
    SimulationController::new(config, series).unwrap()
}

#[test]
fn scripted_round_settles_and_conserves_value() {
    let mut round = round(flat_series(60), 10, 30);
    round.set_leverage(10).unwrap();
    round.toggle_play();

    // Open 1.0, add 0.5, then take 0.5 back off. At a constant price every
    // P&L is zero, so the final balance must be exactly the initial
    // balance minus the four taker fees.
    let open = round.open_position(Side::Long, dec!(1)).unwrap();
    assert_eq!(open.margin_locked, dec!(5000));

    for _ in 0..5 {
        assert_eq!(round.tick(), TickEvent::Advanced);
    }

    let add = round.open_position(Side::Long, dec!(0.5)).unwrap();
    assert_eq!(add.margin_locked, dec!(2500));

    for _ in 0..5 {
        round.tick();
    }

    let close = round.close_position(dec!(0.5)).unwrap();
    assert_eq!(close.trade.pnl, dec!(0));
    assert_eq!(close.remaining_quantity, dec!(1));

    while round.tick() != TickEvent::RoundEnded {}

    let result = round.result().unwrap();
    assert_eq!(result.total_trades, 2);
    assert_eq!(result.trades[0].status, TradeStatus::Closed);
    assert_eq!(result.trades[1].status, TradeStatus::Closed);
    assert_eq!(result.trades[1].quantity, dec!(1));

    // Fees: open 25, add 12.5, close 12.5, settlement 25.
    assert_eq!(result.final_balance, dec!(10000) - dec!(75));
    assert_eq!(
        result.total_return_pct,
        (result.final_balance - dec!(10000)) / dec!(10000) * dec!(100)
    );

    // The result is emitted exactly once; later ticks change nothing.
    assert_eq!(round.tick(), TickEvent::Idle);
    assert_eq!(round.result().unwrap().total_trades, 2);
}

#[test]
fn liquidation_round_records_forced_exit() {
    let mut candles: Vec<Candle> = (0..40)
        .map(|i| candle(i, 50000, 50050, 49950, 50000))
        .collect();
    // Deep wick several candles into the window: 10x isolated long from
    // 50000 liquidates at 45250.
    candles[14] = candle(14, 50000, 50050, 45100, 49500);
    let mut round = round(CandleSeries::new(candles).unwrap(), 10, 20);
    round.set_leverage(10).unwrap();

    round.open_position(Side::Long, dec!(1)).unwrap();
    let balance_after_open = round.ledger().balance();
    round.toggle_play();

    let mut saw_liquidation = false;
    loop {
        match round.tick() {
            TickEvent::Liquidated => saw_liquidation = true,
            TickEvent::RoundEnded => break,
            _ => {}
        }
    }
    assert!(saw_liquidation);

    let result = round.result().unwrap();
    assert_eq!(result.total_trades, 1);
    let trade = &result.trades[0];
    assert_eq!(trade.status, TradeStatus::Liquidation);
    assert_eq!(trade.exit_price, dec!(45250));
    assert_eq!(trade.pnl, dec!(-5000));
    // Isolated: the balance survives the liquidation untouched.
    assert_eq!(result.final_balance, balance_after_open);
    assert!(result.max_drawdown_pct > dec!(0));
}

#[tokio::test(start_paused = true)]
async fn play_paces_round_to_completion() {
    let mut round = round(flat_series(30), 10, 15);
    round.set_playback_speed(3.0);
    round.toggle_play();

    let result = round.play().await.expect("round should settle");
    assert_eq!(result.total_trades, 0);
    assert_eq!(result.final_balance, dec!(10000));
    assert!(round.is_ended());
}
