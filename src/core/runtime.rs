//! Orchestrator: owns the feed connection and drives the signal engine.
//!
//! One ingestion task per run reads the tick stream and pushes each tick
//! through [`SignalEngine`] under a single write lock. Feed failures enter a
//! bounded exponential reconnect loop; exhausting it ends the run.

use backon::{ExponentialBuilder, Retryable};
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::error::{DataError, EngineError, FeedError};
use crate::indicators::DEFAULT_MAX_HISTORY;
use crate::metrics::Metrics;
use crate::models::{EngineStatus, RuleDefinition, SnapshotPair, Tick, Timeframe, Watchlist};
use crate::rules::RuleEvaluator;
use crate::services::{HistoryRange, MarketDataFeed, TickStream};
use crate::signals::{SignalEngine, SignalSink, StatusSink};

/// Reason reported once the reconnect budget is spent.
pub const RECONNECT_EXHAUSTED: &str = "reconnect attempts exhausted";

/// Runtime settings for the orchestrator
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub timeframe: Timeframe,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub max_history: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M1,
            max_reconnect_attempts: 10,
            reconnect_base_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(60),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

struct Shared {
    config: RuntimeConfig,
    engine: RwLock<SignalEngine>,
    status: RwLock<EngineStatus>,
    feed: Arc<dyn MarketDataFeed>,
    clock: Arc<dyn Clock>,
    signal_sinks: Vec<Arc<dyn SignalSink>>,
    status_sinks: Vec<Arc<dyn StatusSink>>,
    metrics: Option<Arc<Metrics>>,
}

impl Shared {
    /// Applies `update` to the status and fans the result out to sinks.
    fn publish(&self, update: impl FnOnce(&mut EngineStatus)) {
        let snapshot = {
            let mut status = self.status.write();
            update(&mut status);
            status.clone()
        };
        if let Some(metrics) = &self.metrics {
            metrics.set_connected(snapshot.is_connected);
        }
        for sink in &self.status_sinks {
            sink.report(&snapshot);
        }
    }

    fn handle_tick(&self, tick: Tick) {
        let started = Instant::now();
        let now = self.clock.now();
        let result = self.engine.write().process_tick(&tick, now);

        match result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.tick_processed(started.elapsed().as_secs_f64());
                    if outcome.completed.is_some() {
                        metrics.candle_completed();
                    }
                }
                if let Some(signal) = outcome.signal {
                    for sink in &self.signal_sinks {
                        sink.record(&signal);
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics.signal_emitted(&signal.symbol);
                    }
                }
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.tick_dropped(e.kind());
                }
                match e {
                    DataError::Duplicate { .. } => debug!(error = %e, "Dropping tick"),
                    _ => warn!(symbol = %tick.symbol, reason = e.kind(), error = %e, "Dropping tick"),
                }
            }
        }
    }

    fn reset_engine(&self) {
        self.engine.write().deactivate();
    }
}

struct RunHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Collects the feed, clock, sinks and settings for an [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: RuntimeConfig,
    feed: Arc<dyn MarketDataFeed>,
    clock: Arc<dyn Clock>,
    signal_sinks: Vec<Arc<dyn SignalSink>>,
    status_sinks: Vec<Arc<dyn StatusSink>>,
    metrics: Option<Arc<Metrics>>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn signal_sink(mut self, sink: Arc<dyn SignalSink>) -> Self {
        self.signal_sinks.push(sink);
        self
    }

    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status_sinks.push(sink);
        self
    }

    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Orchestrator {
        let timeframe = self.config.timeframe;
        let engine = SignalEngine::new(timeframe, self.config.max_history);
        Orchestrator {
            shared: Arc::new(Shared {
                engine: RwLock::new(engine),
                status: RwLock::new(EngineStatus::stopped(timeframe)),
                config: self.config,
                feed: self.feed,
                clock: self.clock,
                signal_sinks: self.signal_sinks,
                status_sinks: self.status_sinks,
                metrics: self.metrics,
            }),
            run: Mutex::new(None),
        }
    }
}

/// Owns one signal engine and at most one live ingestion run.
pub struct Orchestrator {
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

impl Orchestrator {
    pub fn builder(feed: Arc<dyn MarketDataFeed>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config: RuntimeConfig::default(),
            feed,
            clock: Arc::new(SystemClock),
            signal_sinks: Vec::new(),
            status_sinks: Vec::new(),
            metrics: None,
        }
    }

    /// Validates the rule, warm-starts every symbol, subscribes, and spawns
    /// the ingestion task.
    pub async fn start(&self, watchlist: Watchlist, rule: RuleDefinition) -> Result<(), EngineError> {
        let mut run = self.run.lock().await;
        if run.as_ref().is_some_and(|h| self.is_active(h)) {
            return Err(EngineError::AlreadyRunning);
        }
        // a previous run ended on its own
        run.take();

        let rule = RuleEvaluator::compile(rule)?;
        let shared = &self.shared;
        let timeframe = shared.engine.read().timeframe();
        info!(
            rule = %rule.name(),
            symbols = ?watchlist.symbols(),
            timeframe = %timeframe,
            "Starting signal engine"
        );
        shared.engine.write().activate(watchlist.clone(), rule);

        let now = shared.clock.now();
        let range = HistoryRange::warm_start(now, timeframe);
        for symbol in watchlist.symbols() {
            match shared.feed.fetch_history(symbol, range, timeframe).await {
                Ok(candles) => {
                    let finished: Vec<_> = candles
                        .into_iter()
                        .filter(|c| c.period_end() <= now)
                        .collect();
                    let loaded = shared.engine.write().warm_start(symbol, finished);
                    info!(symbol = %symbol, candles = loaded, "Warm-start complete");
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Warm-start fetch failed; warming up from live data");
                }
            }
        }

        let stream = match shared.feed.subscribe(watchlist.symbols()).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Initial subscription failed");
                shared.reset_engine();
                let reason = e.to_string();
                shared.publish(|status| {
                    *status = EngineStatus::stopped(timeframe);
                    status.degraded_reason = Some(reason);
                });
                return Err(EngineError::Connection(e));
            }
        };

        let symbols = watchlist.symbols().to_vec();
        shared.publish(|status| {
            *status = EngineStatus {
                is_running: true,
                is_connected: true,
                active_symbols: symbols,
                degraded_reason: None,
                reconnect_attempts: 0,
                timeframe,
            };
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_ingestion(shared.clone(), stream, shutdown_rx));
        *run = Some(RunHandle { shutdown, task });
        Ok(())
    }

    /// Stops the current run. Does nothing when no run is active.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(handle) = run.take() else {
            return;
        };
        let active = self.is_active(&handle);

        let _ = handle.shutdown.send(true);
        if let Err(e) = handle.task.await {
            error!(error = %e, "Ingestion task did not shut down cleanly");
        }
        if !active {
            return;
        }

        let shared = &self.shared;
        shared.reset_engine();
        let timeframe = shared.engine.read().timeframe();
        shared.publish(|status| *status = EngineStatus::stopped(timeframe));
        info!("Signal engine stopped");
    }

    /// Changes the candle timeframe. Only allowed while stopped.
    pub async fn set_timeframe(&self, timeframe: Timeframe) -> Result<(), EngineError> {
        let run = self.run.lock().await;
        if run.as_ref().is_some_and(|h| self.is_active(h)) {
            return Err(EngineError::TimeframeLocked);
        }
        self.shared.engine.write().set_timeframe(timeframe);
        self.shared.publish(|status| status.timeframe = timeframe);
        info!(timeframe = %timeframe, "Timeframe changed");
        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        self.shared.status.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.status.read().is_running
    }

    pub fn snapshot(&self, symbol: &str) -> Option<SnapshotPair> {
        self.shared.engine.read().snapshot(symbol)
    }

    pub fn timeframe(&self) -> Timeframe {
        self.shared.engine.read().timeframe()
    }

    /// A run that gave up on the feed has already reset and reported itself,
    /// even if its task has not returned yet.
    fn is_active(&self, handle: &RunHandle) -> bool {
        !handle.task.is_finished() && self.shared.status.read().is_running
    }
}

enum Reconnect {
    Connected(TickStream),
    Exhausted(Option<FeedError>),
    Shutdown,
}

async fn run_ingestion(shared: Arc<Shared>, mut stream: TickStream, mut shutdown: watch::Receiver<bool>) {
    loop {
        let reason = loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                item = stream.next() => match item {
                    Some(Ok(tick)) => shared.handle_tick(tick),
                    Some(Err(e)) => break e.to_string(),
                    None => break "feed stream ended".to_string(),
                },
            }
        };

        warn!(reason = %reason, "Feed disconnected");
        shared.publish(|status| {
            status.is_connected = false;
            status.degraded_reason = Some(reason);
        });

        match reconnect(&shared, &mut shutdown).await {
            Reconnect::Connected(next) => {
                stream = next;
                info!("Feed reconnected");
                shared.publish(|status| {
                    status.is_connected = true;
                    status.degraded_reason = None;
                    status.reconnect_attempts = 0;
                });
            }
            Reconnect::Shutdown => return,
            Reconnect::Exhausted(last_error) => {
                let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
                error!(error = %detail, "Giving up on the feed");
                shared.reset_engine();
                let reason = if detail.is_empty() {
                    RECONNECT_EXHAUSTED.to_string()
                } else {
                    format!("{}: {}", RECONNECT_EXHAUSTED, detail)
                };
                shared.publish(|status| {
                    status.is_running = false;
                    status.is_connected = false;
                    status.active_symbols.clear();
                    status.degraded_reason = Some(reason);
                });
                return;
            }
        }
    }
}

/// Retries `subscribe` with exponential backoff until it succeeds, the
/// attempt budget runs out, or shutdown is requested.
///
/// Attempt `n` waits `base * 2^(n-1)`, capped at the configured maximum.
async fn reconnect(shared: &Arc<Shared>, shutdown: &mut watch::Receiver<bool>) -> Reconnect {
    let config = &shared.config;
    if config.max_reconnect_attempts == 0 {
        return Reconnect::Exhausted(None);
    }

    let symbols = shared.engine.read().active_symbols();
    let symbols = symbols.as_slice();
    let attempts = &AtomicU32::new(0);
    let (base, first_retry) = reconnect_delays(config);
    let backoff = ExponentialBuilder::default()
        .with_min_delay(first_retry)
        .with_max_delay(config.reconnect_max_delay)
        .with_factor(2.0)
        .with_max_times(config.max_reconnect_attempts.saturating_sub(1) as usize);

    let connect = move || async move {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, max = config.max_reconnect_attempts, "Reconnecting to feed");
        if let Some(metrics) = &shared.metrics {
            metrics.reconnect_attempted();
        }
        shared.publish(|status| status.reconnect_attempts = attempt);
        shared.feed.subscribe(symbols).await
    };

    let retrying = async {
        tokio::time::sleep(base).await;
        connect
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|e: &FeedError, delay: Duration| {
                warn!(error = %e, retry_in = ?delay, "Reconnect attempt failed");
            })
            .await
    };

    tokio::select! {
        biased;
        _ = shutdown.changed() => Reconnect::Shutdown,
        result = retrying => match result {
            Ok(stream) => Reconnect::Connected(stream),
            Err(e) => Reconnect::Exhausted(Some(e)),
        },
    }
}

/// Wait before the first attempt and before the first retry, both capped
/// at the configured maximum.
fn reconnect_delays(config: &RuntimeConfig) -> (Duration, Duration) {
    let base = config.reconnect_base_delay.min(config.reconnect_max_delay);
    (base, base.saturating_mul(2).min(config.reconnect_max_delay))
}
