//! Prometheus metrics for the ingestion path.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    ticks_processed: IntCounter,
    ticks_dropped: IntCounterVec,
    candles_completed: IntCounter,
    signals_emitted: IntCounterVec,
    reconnect_attempts: IntCounter,
    feed_connected: IntGauge,
    tick_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("signalgen".to_string()), None)?;

        let ticks_processed = IntCounter::new("ticks_processed_total", "Ticks accepted by the engine")?;
        let ticks_dropped = IntCounterVec::new(
            Opts::new("ticks_dropped_total", "Ticks rejected on ingestion"),
            &["reason"],
        )?;
        let candles_completed =
            IntCounter::new("candles_completed_total", "Candles finalized by the aggregator")?;
        let signals_emitted = IntCounterVec::new(
            Opts::new("signals_emitted_total", "Signals delivered to sinks"),
            &["symbol"],
        )?;
        let reconnect_attempts =
            IntCounter::new("reconnect_attempts_total", "Feed reconnection attempts")?;
        let feed_connected = IntGauge::new("feed_connected", "1 while the live feed is connected")?;
        let tick_duration = Histogram::with_opts(
            HistogramOpts::new("tick_duration_seconds", "Time spent processing one tick")
                .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]),
        )?;

        registry.register(Box::new(ticks_processed.clone()))?;
        registry.register(Box::new(ticks_dropped.clone()))?;
        registry.register(Box::new(candles_completed.clone()))?;
        registry.register(Box::new(signals_emitted.clone()))?;
        registry.register(Box::new(reconnect_attempts.clone()))?;
        registry.register(Box::new(feed_connected.clone()))?;
        registry.register(Box::new(tick_duration.clone()))?;

        Ok(Self {
            registry,
            ticks_processed,
            ticks_dropped,
            candles_completed,
            signals_emitted,
            reconnect_attempts,
            feed_connected,
            tick_duration,
        })
    }

    pub fn tick_processed(&self, seconds: f64) {
        self.ticks_processed.inc();
        self.tick_duration.observe(seconds);
    }

    pub fn tick_dropped(&self, reason: &str) {
        self.ticks_dropped.with_label_values(&[reason]).inc();
    }

    pub fn candle_completed(&self) {
        self.candles_completed.inc();
    }

    pub fn signal_emitted(&self, symbol: &str) {
        self.signals_emitted.with_label_values(&[symbol]).inc();
    }

    pub fn reconnect_attempted(&self) {
        self.reconnect_attempts.inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.feed_connected.set(i64::from(connected));
    }

    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed.get()
    }

    pub fn ticks_dropped(&self, reason: &str) -> u64 {
        self.ticks_dropped.with_label_values(&[reason]).get()
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.get()
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
