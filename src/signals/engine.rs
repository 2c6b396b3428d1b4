//! Synchronous per-tick pipeline: aggregation, indicators, rule, throttle.
//!
//! `SignalEngine` owns every piece of per-symbol state. It never awaits, so
//! the orchestrator can run a whole tick under one lock, and batch replays
//! can drive it directly with historical candles.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::candles::CandleAggregator;
use crate::error::DataError;
use crate::indicators::IndicatorCalculator;
use crate::models::{Candle, Rule, Signal, SnapshotPair, Tick, Timeframe, Watchlist};
use crate::rules::RuleEvaluator;
use crate::signals::state_machine::{Lifecycle, SignalStateMachine};

/// What one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub completed: Option<Candle>,
    pub signal: Option<Signal>,
}

/// Aggregator, calculator, active rule and per-symbol throttles.
pub struct SignalEngine {
    aggregator: CandleAggregator,
    calculator: IndicatorCalculator,
    rule: Option<Rule>,
    watchlist: Option<Watchlist>,
    machines: HashMap<String, SignalStateMachine>,
}

impl SignalEngine {
    pub fn new(timeframe: Timeframe, max_history: usize) -> Self {
        Self {
            aggregator: CandleAggregator::new(timeframe),
            calculator: IndicatorCalculator::new(timeframe, max_history),
            rule: None,
            watchlist: None,
            machines: HashMap::new(),
        }
    }

    /// Installs the watchlist and rule for a new run. All prior symbol state
    /// is dropped.
    pub fn activate(&mut self, watchlist: Watchlist, rule: Rule) {
        self.reset();
        for symbol in watchlist.symbols() {
            self.machines.insert(symbol.clone(), SignalStateMachine::new());
        }
        self.watchlist = Some(watchlist);
        self.rule = Some(rule);
    }

    /// Drops all per-symbol state. The rule and watchlist stay installed.
    pub fn reset(&mut self) {
        self.aggregator.clear();
        self.calculator.clear();
        self.machines.clear();
    }

    /// Drops state and forgets the rule and watchlist.
    pub fn deactivate(&mut self) {
        self.reset();
        self.rule = None;
        self.watchlist = None;
    }

    pub fn timeframe(&self) -> Timeframe {
        self.aggregator.timeframe()
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.aggregator.set_timeframe(timeframe);
        self.calculator.set_timeframe(timeframe);
        self.machines.clear();
    }

    pub fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    pub fn watchlist(&self) -> Option<&Watchlist> {
        self.watchlist.as_ref()
    }

    pub fn active_symbols(&self) -> Vec<String> {
        self.watchlist
            .as_ref()
            .map(|w| w.symbols().to_vec())
            .unwrap_or_default()
    }

    /// Loads history for `symbol` and marks its last period as finalized.
    pub fn warm_start(&mut self, symbol: &str, history: Vec<Candle>) -> usize {
        let loaded = self.calculator.warm_start(symbol, history);
        if let Some(last) = self.calculator.last_period(symbol) {
            self.aggregator.seed_boundary(symbol, last);
        }
        loaded
    }

    /// Runs one tick through the pipeline.
    pub fn process_tick(&mut self, tick: &Tick, now: DateTime<Utc>) -> Result<TickOutcome, DataError> {
        self.ensure_watched(&tick.symbol)?;

        let Some(candle) = self.aggregator.ingest(&tick.symbol, tick)? else {
            return Ok(TickOutcome::default());
        };

        let signal = self.process_candle(&tick.symbol, candle.clone(), now)?;
        Ok(TickOutcome {
            completed: Some(candle),
            signal,
        })
    }

    /// Applies a completed candle and evaluates the rule.
    pub fn process_candle(
        &mut self,
        symbol: &str,
        candle: Candle,
        now: DateTime<Utc>,
    ) -> Result<Option<Signal>, DataError> {
        self.ensure_watched(symbol)?;

        let price = candle.close;
        let period_start = candle.period_start;
        let pair = self.calculator.on_candle(symbol, candle)?;
        debug!(
            symbol = %symbol,
            period_start = %period_start,
            close = price,
            indicators = pair.current.len(),
            "Candle completed"
        );

        let Some(rule) = self.rule.as_ref() else {
            return Ok(None);
        };

        let machine = self.machines.entry(symbol.to_string()).or_default();
        let lifecycle = machine.poll(now, rule.cooldown());

        if !RuleEvaluator::evaluate(rule, &pair.current, &pair.previous) {
            return Ok(None);
        }
        if lifecycle == Lifecycle::Cooldown {
            debug!(symbol = %symbol, rule = %rule.name(), "Rule matched during cooldown");
            return Ok(None);
        }
        if !machine.fire(now) {
            return Ok(None);
        }

        info!(symbol = %symbol, rule = %rule.name(), price = price, "Rule matched");
        Ok(Some(Signal {
            symbol: symbol.to_string(),
            signal_kind: rule.signal_kind(),
            price,
            timestamp: now,
            rule_id: rule.id().to_string(),
            rule_name: rule.name().to_string(),
            indicators: pair.current,
        }))
    }

    pub fn snapshot(&self, symbol: &str) -> Option<SnapshotPair> {
        self.calculator.snapshot(symbol)
    }

    pub fn current_candle(&self, symbol: &str) -> Option<Candle> {
        self.aggregator.current(symbol)
    }

    pub fn candle_count(&self, symbol: &str) -> usize {
        self.calculator.candle_count(symbol)
    }

    pub fn lifecycle(&self, symbol: &str) -> Lifecycle {
        self.machines
            .get(symbol)
            .map_or(Lifecycle::Idle, |m| m.lifecycle())
    }

    fn ensure_watched(&self, symbol: &str) -> Result<(), DataError> {
        match &self.watchlist {
            Some(watchlist) if watchlist.contains(symbol) => Ok(()),
            _ => Err(DataError::UnknownSymbol(symbol.to_string())),
        }
    }
}
