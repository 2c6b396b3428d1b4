//! Test utilities for orchestrator integration tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use signalgen::core::{ManualClock, Orchestrator, RuntimeConfig};
use signalgen::metrics::Metrics;
use signalgen::models::{Candle, EngineStatus, Signal, Tick, Timeframe};
use signalgen::services::ReplayFeed;
use signalgen::signals::ChannelSink;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
}

/// Reconnect quickly so retry tests finish in milliseconds.
pub fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        reconnect_base_delay: std::time::Duration::from_millis(1),
        reconnect_max_delay: std::time::Duration::from_millis(4),
        ..RuntimeConfig::default()
    }
}

/// `count` rising one-minute candles ending right before [`now`].
pub fn history(symbol: &str, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let start = now() - Duration::minutes((count - i) as i64);
            let price = 100.0 + i as f64 * 0.25;
            Candle::completed(symbol, Timeframe::M1, start, price, price + 0.2, price - 0.2, price, 500.0)
        })
        .collect()
}

pub fn live_tick(symbol: &str, secs_after_now: i64, price: f64) -> Tick {
    Tick::trade(symbol, now() + Duration::seconds(secs_after_now), price, 10.0)
}

pub struct TestOrchestrator {
    pub feed: ReplayFeed,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<Metrics>,
    pub orchestrator: Orchestrator,
    pub signals: UnboundedReceiver<Signal>,
    pub statuses: UnboundedReceiver<EngineStatus>,
}

impl TestOrchestrator {
    pub fn new(feed: ReplayFeed, config: RuntimeConfig) -> Self {
        let clock = Arc::new(ManualClock::new(now()));
        let metrics = Arc::new(Metrics::new().expect("metrics registry"));
        let (signal_sink, signals) = ChannelSink::<Signal>::channel();
        let (status_sink, statuses) = ChannelSink::<EngineStatus>::channel();

        let orchestrator = Orchestrator::builder(Arc::new(feed.clone()))
            .config(config)
            .clock(clock.clone())
            .signal_sink(Arc::new(signal_sink))
            .status_sink(Arc::new(status_sink))
            .metrics(metrics.clone())
            .build();

        Self {
            feed,
            clock,
            metrics,
            orchestrator,
            signals,
            statuses,
        }
    }

    /// Waits for a status matching `pred`, skipping others.
    pub async fn wait_for_status<F>(&mut self, mut pred: F) -> EngineStatus
    where
        F: FnMut(&EngineStatus) -> bool,
    {
        let deadline = tokio::time::Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                let status = self.statuses.recv().await.expect("status channel open");
                if pred(&status) {
                    return status;
                }
            }
        })
        .await
        .expect("expected status was not reported in time")
    }

    /// Collects every status up to and including the first one matching `pred`.
    pub async fn statuses_until<F>(&mut self, pred: F) -> Vec<EngineStatus>
    where
        F: Fn(&EngineStatus) -> bool,
    {
        let mut seen = Vec::new();
        self.wait_for_status(|status| {
            seen.push(status.clone());
            pred(status)
        })
        .await;
        seen
    }

    pub async fn next_signal(&mut self) -> Signal {
        tokio::time::timeout(tokio::time::Duration::from_secs(5), self.signals.recv())
            .await
            .expect("signal was not emitted in time")
            .expect("signal channel open")
    }

    /// Waits until the engine has accepted `count` ticks in total.
    pub async fn wait_for_ticks(&self, count: u64) {
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(5);
        while self.metrics.ticks_processed() < count {
            assert!(tokio::time::Instant::now() < deadline, "ticks were not processed in time");
            tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;
        }
    }

    pub fn drain_statuses(&mut self) -> Vec<EngineStatus> {
        let mut out = Vec::new();
        while let Ok(status) = self.statuses.try_recv() {
            out.push(status);
        }
        out
    }
}
