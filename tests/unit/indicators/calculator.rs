//! Unit tests for the indicator calculator

use chrono::{DateTime, Duration, TimeZone, Utc};
use signalgen::common::math;
use signalgen::indicators::momentum::calculate_rsi;
use signalgen::indicators::{IndicatorCalculator, IndicatorId, DEFAULT_MAX_HISTORY};
use signalgen::models::{Candle, Timeframe};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

/// Deterministic wavy series with varying volume.
fn create_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.3).sin() * 5.0 + x * 0.05;
            Candle::completed(
                "ETH",
                Timeframe::M1,
                start() + Duration::minutes(i as i64),
                close - 0.2,
                close + 0.6 + (x * 0.7).cos().abs(),
                close - 0.6 - (x * 0.5).sin().abs(),
                close,
                1_000.0 + (x * 1.1).cos() * 300.0,
            )
        })
        .collect()
}

fn calculator() -> IndicatorCalculator {
    IndicatorCalculator::new(Timeframe::M1, DEFAULT_MAX_HISTORY)
}

#[test]
fn availability_matches_lookback_table() {
    let candles = create_candles(210);
    let mut calc = calculator();
    for (i, candle) in candles.into_iter().enumerate() {
        let seen = i + 1;
        let pair = calc.on_candle("ETH", candle).unwrap();
        for id in IndicatorId::ALL {
            assert_eq!(
                pair.current.contains(id),
                seen >= id.lookback(),
                "{} after {} candles",
                id,
                seen
            );
        }
    }
}

#[test]
fn values_match_batch_definitions() {
    let candles = create_candles(120);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let mut calc = calculator();
    calc.warm_start("ETH", candles);
    let current = calc.snapshot("ETH").unwrap().current;

    let close = current.get(IndicatorId::Price).unwrap();
    let approx = |id: IndicatorId, expected: f64| {
        let got = current.get(id).unwrap();
        assert!((got - expected).abs() < 1e-9, "{}: {} vs {}", id, got, expected);
    };

    approx(IndicatorId::Ma20, math::sma(&closes, 20).unwrap());
    approx(IndicatorId::Ma50, math::sma(&closes, 50).unwrap());
    approx(IndicatorId::Ema9, math::ema(&closes, 9).unwrap());
    approx(IndicatorId::Ema50, math::ema(&closes, 50).unwrap());
    approx(IndicatorId::Rsi14, calculate_rsi(&closes, 14).unwrap());
    approx(
        IndicatorId::Macd,
        math::ema(&closes, 12).unwrap() - math::ema(&closes, 26).unwrap(),
    );

    let middle = math::sma(&closes, 20).unwrap();
    let std = math::population_std(&closes[closes.len() - 20..]).unwrap();
    approx(IndicatorId::BbMiddle, middle);
    approx(IndicatorId::BbUpper, middle + 2.0 * std);
    approx(IndicatorId::BbLower, middle - 2.0 * std);

    let preceding = &volumes[volumes.len() - 21..volumes.len() - 1];
    approx(
        IndicatorId::RelVolume20,
        volumes[volumes.len() - 1] / math::mean(preceding).unwrap(),
    );

    let ema20 = math::ema(&closes, 20).unwrap();
    approx(IndicatorId::PriceEma20DiffPct, (close - ema20).abs() / ema20);
}

#[test]
fn previous_is_one_candle_behind_current() {
    let mut calc = calculator();
    let mut last_current = None;
    for candle in create_candles(40) {
        let pair = calc.on_candle("ETH", candle).unwrap();
        if let Some(prev) = last_current {
            assert_eq!(pair.previous, prev);
        }
        last_current = Some(pair.current);
    }
}

#[test]
fn warm_start_previous_equals_live_fed_history() {
    let history = create_candles(60);

    let mut warm = calculator();
    let loaded = warm.warm_start("ETH", history.clone());
    assert_eq!(loaded, 60);
    let warm_pair = warm.snapshot("ETH").unwrap();

    let mut live = calculator();
    live.warm_start("ETH", history[..59].to_vec());
    let before_last = live.snapshot("ETH").unwrap().current;
    let live_pair = live.on_candle("ETH", history[59].clone()).unwrap();

    assert_eq!(warm_pair.previous, before_last);
    assert_eq!(warm_pair.previous, live_pair.previous);
    assert_eq!(warm_pair.current, live_pair.current);
}

#[test]
fn warm_start_sorts_and_dedups() {
    let mut history = create_candles(30);
    history.reverse();
    history.push(history[3].clone());

    let mut calc = calculator();
    assert_eq!(calc.warm_start("ETH", history), 30);
    let candles = calc.candles("ETH");
    assert!(candles.windows(2).all(|w| w[0].period_start < w[1].period_start));
}

#[test]
fn warm_start_replaces_existing_state() {
    let mut calc = calculator();
    for candle in create_candles(10) {
        calc.on_candle("ETH", candle).unwrap();
    }
    calc.warm_start("ETH", create_candles(3));
    assert_eq!(calc.candle_count("ETH"), 3);

    calc.warm_start("ETH", Vec::new());
    assert!(calc.snapshot("ETH").is_none());
}

#[test]
fn stale_candle_is_rejected() {
    let candles = create_candles(3);
    let mut calc = calculator();
    calc.on_candle("ETH", candles[1].clone()).unwrap();
    let err = calc.on_candle("ETH", candles[0].clone()).unwrap_err();
    assert_eq!(err.kind(), "stale");
    let err = calc.on_candle("ETH", candles[1].clone()).unwrap_err();
    assert_eq!(err.kind(), "stale");
}

#[test]
fn set_timeframe_discards_history() {
    let mut calc = calculator();
    for candle in create_candles(5) {
        calc.on_candle("ETH", candle).unwrap();
    }
    calc.set_timeframe(Timeframe::M5);
    assert_eq!(calc.candle_count("ETH"), 0);
    assert!(calc.snapshot("ETH").is_none());
}
