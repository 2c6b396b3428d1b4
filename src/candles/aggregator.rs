//! Groups streaming ticks into boundary-aligned candles.
//!
//! Each symbol keeps one in-progress candle. A tick whose period starts
//! after the in-progress one closes it out and opens the next. Nothing is
//! emitted for periods in which no tick arrived.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::DataError;
use crate::models::{Candle, Tick, Timeframe};

/// Per-symbol limit on remembered tick timestamps.
pub const SEEN_TIMESTAMPS_CAPACITY: usize = 10_000;

/// Bounded FIFO set of timestamps, in epoch milliseconds.
#[derive(Debug, Default)]
struct SeenTimestamps {
    order: VecDeque<i64>,
    members: HashSet<i64>,
}

impl SeenTimestamps {
    fn contains(&self, key: i64) -> bool {
        self.members.contains(&key)
    }

    fn insert(&mut self, key: i64) {
        if !self.members.insert(key) {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > SEEN_TIMESTAMPS_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }
}

#[derive(Debug, Default)]
struct SymbolAggregation {
    current: Option<Candle>,
    /// Period start of the newest candle already handed downstream.
    finalized_boundary: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    seen: SeenTimestamps,
}

/// Per-symbol candle builder for a single timeframe.
pub struct CandleAggregator {
    timeframe: Timeframe,
    symbols: HashMap<String, SymbolAggregation>,
}

impl CandleAggregator {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            symbols: HashMap::new(),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Switches timeframe and drops every in-flight candle.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.symbols.clear();
    }

    /// Feeds one tick. Returns the candle it completed, if any.
    ///
    /// Rejected ticks leave the aggregation state untouched.
    pub fn ingest(&mut self, symbol: &str, tick: &Tick) -> Result<Option<Candle>, DataError> {
        tick.validate()?;

        let timeframe = self.timeframe;
        let state = self.symbols.entry(symbol.to_string()).or_default();
        let key = tick.timestamp.timestamp_millis();

        if state.seen.contains(key) {
            return Err(DataError::Duplicate {
                symbol: symbol.to_string(),
                timestamp: tick.timestamp,
            });
        }

        if let Some(last) = state.last_timestamp {
            if tick.timestamp < last {
                return Err(DataError::Stale {
                    symbol: symbol.to_string(),
                    timestamp: tick.timestamp,
                    boundary: last,
                });
            }
        }

        let period_start = timeframe.align(tick.timestamp);
        if let Some(boundary) = state.finalized_boundary {
            if period_start <= boundary {
                return Err(DataError::Stale {
                    symbol: symbol.to_string(),
                    timestamp: tick.timestamp,
                    boundary,
                });
            }
        }

        state.seen.insert(key);
        state.last_timestamp = Some(tick.timestamp);

        if let Some(candle) = state
            .current
            .as_mut()
            .filter(|c| c.period_start == period_start)
        {
            candle.absorb(tick);
            return Ok(None);
        }

        let mut finished = state
            .current
            .replace(Candle::open_with(tick, timeframe, period_start));
        if let Some(candle) = finished.as_mut() {
            candle.completed = true;
            state.finalized_boundary = Some(candle.period_start);
        }
        Ok(finished)
    }

    /// In-progress candle for `symbol`.
    pub fn current(&self, symbol: &str) -> Option<Candle> {
        self.symbols.get(symbol).and_then(|s| s.current.clone())
    }

    /// Marks every period up to and including `period_start` as finalized.
    ///
    /// Used after a warm-start so live ticks for already-loaded periods are
    /// rejected as stale.
    pub fn seed_boundary(&mut self, symbol: &str, period_start: DateTime<Utc>) {
        let state = self.symbols.entry(symbol.to_string()).or_default();
        state.finalized_boundary = Some(match state.finalized_boundary {
            Some(existing) if existing > period_start => existing,
            _ => period_start,
        });
    }

    pub fn remove_symbol(&mut self, symbol: &str) {
        self.symbols.remove(symbol);
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }
}
