//! Integration tests for the orchestrator lifecycle
//!
//! Driven by the in-memory replay feed and a manual clock.

#[path = "runtime/test_utils.rs"]
mod test_utils;

use chrono::Duration;
use signalgen::core::{RuntimeConfig, RECONNECT_EXHAUSTED};
use signalgen::indicators::IndicatorId;
use signalgen::models::{Candle, RuleDefinition, Timeframe, Watchlist};
use signalgen::services::{ReplayFeed, ReplaySession};
use signalgen::EngineError;
use tokio_test::{assert_err, assert_ok};

use test_utils::{fast_config, history, live_tick, now, TestOrchestrator};

fn any_price_rule() -> RuleDefinition {
    RuleDefinition::new("Any price", 60).with_condition("PRICE", ">", 0.0)
}

fn watchlist() -> Watchlist {
    Watchlist::new(["AAPL"]).unwrap()
}

#[tokio::test]
async fn start_warm_starts_and_reports_running() {
    let feed = ReplayFeed::new().with_history("AAPL", history("AAPL", 40));
    let mut t = TestOrchestrator::new(feed, fast_config());

    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    let status = t.wait_for_status(|s| s.is_running).await;
    assert!(status.is_connected);
    assert_eq!(status.active_symbols, vec!["AAPL".to_string()]);
    assert_eq!(status.timeframe, Timeframe::M1);
    assert!(t.orchestrator.is_running());

    let pair = t.orchestrator.snapshot("AAPL").unwrap();
    assert!(pair.current.contains(IndicatorId::Ema20));
    assert!(pair.previous.contains(IndicatorId::Ema20));
    assert_eq!(t.feed.history_calls(), 1);

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn start_while_running_is_rejected() {
    let mut t = TestOrchestrator::new(ReplayFeed::new(), fast_config());
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    let err = assert_err!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    assert!(matches!(err, EngineError::AlreadyRunning));

    let err = assert_err!(t.orchestrator.set_timeframe(Timeframe::M5).await);
    assert!(matches!(err, EngineError::TimeframeLocked));

    t.orchestrator.stop().await;
    let stopped = t.wait_for_status(|s| !s.is_running).await;
    assert!(!stopped.is_connected);

    assert_ok!(t.orchestrator.set_timeframe(Timeframe::M5).await);
    assert_eq!(t.orchestrator.status().timeframe, Timeframe::M5);
}

#[tokio::test]
async fn invalid_rule_is_rejected_before_connecting() {
    let mut t = TestOrchestrator::new(ReplayFeed::new(), fast_config());
    let rule = RuleDefinition::new("bad", 60).with_condition("PRICE", ">", "NOPE");

    let err = assert_err!(t.orchestrator.start(watchlist(), rule).await);
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(t.feed.subscribe_calls(), 0);
    assert!(t.drain_statuses().is_empty());
}

#[tokio::test]
async fn live_ticks_emit_signals() {
    let feed = ReplayFeed::new().with_history("AAPL", history("AAPL", 30));
    let mut t = TestOrchestrator::new(feed, fast_config());
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    assert!(t.feed.push(live_tick("AAPL", 5, 110.0)));
    assert!(t.feed.push(live_tick("AAPL", 30, 111.0)));
    assert!(t.feed.push(live_tick("AAPL", 65, 112.0)));

    let signal = t.next_signal().await;
    assert_eq!(signal.symbol, "AAPL");
    assert_eq!(signal.price, 111.0);
    assert_eq!(signal.rule_name, "Any price");
    assert_eq!(signal.timestamp, now());

    // second candle inside the cooldown is throttled
    t.clock.advance(Duration::seconds(30));
    assert!(t.feed.push(live_tick("AAPL", 125, 113.0)));
    t.wait_for_ticks(4).await;
    t.clock.advance(Duration::seconds(31));
    assert!(t.feed.push(live_tick("AAPL", 185, 114.0)));

    let signal = t.next_signal().await;
    assert_eq!(signal.price, 113.0);
    assert!(t.signals.try_recv().is_err());

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn rejected_ticks_are_counted_not_fatal() {
    let feed = ReplayFeed::new().with_history("AAPL", history("AAPL", 30));
    let mut t = TestOrchestrator::new(feed, fast_config());
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    // inside the last warm-started period
    assert!(t.feed.push(live_tick("AAPL", -30, 100.0)));
    assert!(t.feed.push(live_tick("MSFT", 5, 100.0)));
    assert!(t.feed.push(live_tick("AAPL", 5, 101.0)));
    assert!(t.feed.push(live_tick("AAPL", 5, 101.0)));
    assert!(t.feed.push(live_tick("AAPL", 61, 102.0)));

    t.next_signal().await;
    assert_eq!(t.metrics.ticks_dropped("stale"), 1);
    assert_eq!(t.metrics.ticks_dropped("unknown_symbol"), 1);
    assert_eq!(t.metrics.ticks_dropped("duplicate"), 1);
    assert!(t.orchestrator.is_running());

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn warm_start_drops_unfinished_candles() {
    let mut candles = history("AAPL", 30);
    candles.push(Candle::completed("AAPL", Timeframe::M1, now(), 1.0, 1.0, 1.0, 1.0, 1.0));
    let feed = ReplayFeed::new().with_history("AAPL", candles);
    let mut t = TestOrchestrator::new(feed, fast_config());
    t.clock.advance(Duration::seconds(30));

    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    let pair = t.orchestrator.snapshot("AAPL").unwrap();
    assert_eq!(pair.current.as_of, Some(now() - Duration::minutes(1)));

    // the unfinished period is still open for live ticks
    assert!(t.feed.push(live_tick("AAPL", 40, 120.0)));
    assert!(t.feed.push(live_tick("AAPL", 70, 121.0)));
    let signal = t.next_signal().await;
    assert_eq!(signal.price, 120.0);

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn history_failure_is_not_fatal() {
    let feed = ReplayFeed::new();
    feed.fail_history("AAPL");
    let mut t = TestOrchestrator::new(feed, fast_config());

    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    assert!(t.orchestrator.is_running());
    assert!(t.orchestrator.snapshot("AAPL").is_none());

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn initial_subscribe_failure_fails_start() {
    let feed = ReplayFeed::new();
    feed.refuse_connections(1);
    let mut t = TestOrchestrator::new(feed, fast_config());

    let err = assert_err!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    assert!(matches!(err, EngineError::Connection(_)));
    assert!(!t.orchestrator.is_running());
    assert!(t.orchestrator.status().degraded_reason.is_some());

    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    assert!(t.orchestrator.is_running());
    t.orchestrator.stop().await;
}

#[tokio::test]
async fn reconnects_after_disconnect() {
    let feed = ReplayFeed::new().with_history("AAPL", history("AAPL", 30));
    feed.queue_session(ReplaySession::Closing(vec![live_tick("AAPL", 5, 110.0)]));
    feed.refuse_connections(2);
    let mut t = TestOrchestrator::new(feed, fast_config());

    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    let degraded = t.wait_for_status(|s| s.is_degraded()).await;
    assert!(degraded.is_running);
    assert!(!degraded.is_connected);

    // every attempt is reported before the recovery
    let statuses = t.statuses_until(|s| s.is_connected && s.is_running).await;
    let (recovered, attempts) = statuses.split_last().unwrap();
    let numbers: Vec<u32> = attempts.iter().map(|s| s.reconnect_attempts).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(attempts.iter().all(|s| s.is_running && !s.is_connected));
    assert_eq!(recovered.reconnect_attempts, 0);
    assert!(recovered.degraded_reason.is_none());
    assert_eq!(t.feed.subscribe_calls(), 4);
    assert_eq!(t.metrics.reconnect_attempts(), 3);

    // ticks flow again; the candle opened before the drop completes
    assert!(t.feed.push(live_tick("AAPL", 65, 111.0)));
    let signal = t.next_signal().await;
    assert_eq!(signal.price, 110.0);

    t.orchestrator.stop().await;
}

#[tokio::test]
async fn reconnect_exhaustion_stops_the_run() {
    let feed = ReplayFeed::new();
    let mut t = TestOrchestrator::new(feed, fast_config());
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    t.feed.refuse_connections(10);
    t.feed.disconnect();

    let status = t
        .wait_for_status(|s| !s.is_running && s.degraded_reason.is_some())
        .await;
    assert!(!status.is_connected);
    assert!(status
        .degraded_reason
        .as_deref()
        .unwrap()
        .starts_with(RECONNECT_EXHAUSTED));
    assert_eq!(t.feed.subscribe_calls(), 11);
    assert!(!t.orchestrator.is_running());
    assert!(!t.feed.push(live_tick("AAPL", 5, 100.0)));
    assert!(t.orchestrator.snapshot("AAPL").is_none());

    // stopping an already-ended run does nothing
    t.drain_statuses();
    t.orchestrator.stop().await;
    assert!(t.drain_statuses().is_empty());

    // an explicit start brings it back
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);
    assert!(t.orchestrator.is_running());
    t.orchestrator.stop().await;
}

#[tokio::test]
async fn stop_cancels_pending_backoff() {
    let config = RuntimeConfig {
        reconnect_base_delay: std::time::Duration::from_secs(60),
        ..RuntimeConfig::default()
    };
    let mut t = TestOrchestrator::new(ReplayFeed::new(), config);
    assert_ok!(t.orchestrator.start(watchlist(), any_price_rule()).await);

    t.feed.disconnect();
    t.wait_for_status(|s| s.is_degraded()).await;

    tokio::time::timeout(tokio::time::Duration::from_secs(2), t.orchestrator.stop())
        .await
        .expect("stop returns without waiting for the backoff");

    let status = t.orchestrator.status();
    assert!(!status.is_running);
    assert!(status.degraded_reason.is_none());
    assert_eq!(t.feed.subscribe_calls(), 1);
}

#[tokio::test]
async fn stop_when_idle_is_a_no_op() {
    let mut t = TestOrchestrator::new(ReplayFeed::new(), fast_config());
    t.orchestrator.stop().await;
    assert!(t.drain_statuses().is_empty());
    assert!(!t.orchestrator.is_running());
}
