//! Unit tests for candle aggregation

use chrono::{DateTime, Duration, TimeZone, Utc};
use signalgen::candles::CandleAggregator;
use signalgen::models::{Tick, Timeframe};
use signalgen::DataError;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap()
}

fn tick_at(secs: i64, price: f64, volume: f64) -> Tick {
    Tick::trade("X", base() + Duration::seconds(secs), price, volume)
}

#[test]
fn five_minute_candle_from_one_minute_ticks() {
    let mut agg = CandleAggregator::new(Timeframe::M5);
    let prices = [10.0, 12.0, 9.0, 11.0, 10.5];
    for (i, price) in prices.iter().enumerate() {
        let out = agg.ingest("X", &tick_at(i as i64 * 60, *price, 1.0)).unwrap();
        assert!(out.is_none(), "no candle before the period ends");
    }

    let completed = agg
        .ingest("X", &tick_at(300, 13.0, 1.0))
        .unwrap()
        .expect("next period closes the first candle");

    assert_eq!(completed.open, 10.0);
    assert_eq!(completed.close, 10.5);
    assert_eq!(completed.high, 12.0);
    assert_eq!(completed.low, 9.0);
    assert_eq!(completed.volume, 5.0);
    assert_eq!(completed.period_start, base());
    assert!(completed.completed);
    assert_eq!(agg.current("X").unwrap().open, 13.0);
}

#[test]
fn open_uses_first_tick_close() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    let tick = Tick::new("X", base(), 9.0, 11.0, 8.5, 10.0, 3.0);
    agg.ingest("X", &tick).unwrap();
    let current = agg.current("X").unwrap();
    assert_eq!(current.open, 10.0);
    assert_eq!(current.high, 10.0);
    assert_eq!(current.low, 10.0);
}

#[test]
fn duplicate_timestamp_is_rejected_without_mutation() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    agg.ingest("X", &tick_at(0, 10.0, 1.0)).unwrap();
    let err = agg.ingest("X", &tick_at(0, 50.0, 100.0)).unwrap_err();
    assert!(matches!(err, DataError::Duplicate { .. }));

    let current = agg.current("X").unwrap();
    assert_eq!(current.high, 10.0);
    assert_eq!(current.volume, 1.0);
}

#[test]
fn out_of_order_tick_is_stale() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    agg.ingest("X", &tick_at(30, 10.0, 1.0)).unwrap();
    let err = agg.ingest("X", &tick_at(10, 10.0, 1.0)).unwrap_err();
    assert_eq!(err.kind(), "stale");
}

#[test]
fn malformed_tick_is_rejected_before_state_changes() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    let err = agg.ingest("X", &tick_at(0, -1.0, 1.0)).unwrap_err();
    assert_eq!(err.kind(), "malformed");
    assert!(agg.current("X").is_none());
    // the timestamp was not recorded as seen
    assert!(agg.ingest("X", &tick_at(0, 10.0, 1.0)).is_ok());
}

#[test]
fn silent_periods_produce_no_candles() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    agg.ingest("X", &tick_at(0, 10.0, 1.0)).unwrap();
    let completed = agg.ingest("X", &tick_at(600, 11.0, 1.0)).unwrap().unwrap();
    assert_eq!(completed.period_start, base());
    assert_eq!(agg.current("X").unwrap().period_start, base() + Duration::minutes(10));
}

#[test]
fn symbols_are_independent() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    agg.ingest("X", &tick_at(0, 10.0, 1.0)).unwrap();
    agg.ingest("Y", &Tick::trade("Y", base(), 20.0, 1.0)).unwrap();
    assert_eq!(agg.current("X").unwrap().close, 10.0);
    assert_eq!(agg.current("Y").unwrap().close, 20.0);

    agg.remove_symbol("X");
    assert!(agg.current("X").is_none());
    assert!(agg.current("Y").is_some());
}

#[test]
fn set_timeframe_discards_in_flight_candles() {
    let mut agg = CandleAggregator::new(Timeframe::M1);
    agg.ingest("X", &tick_at(0, 10.0, 1.0)).unwrap();
    agg.set_timeframe(Timeframe::H1);
    assert_eq!(agg.timeframe(), Timeframe::H1);
    assert!(agg.current("X").is_none());

    // the old timestamp is no longer remembered either
    agg.ingest("X", &tick_at(0, 10.0, 1.0)).unwrap();
    assert_eq!(agg.current("X").unwrap().timeframe, Timeframe::H1);
}
