//! Per-symbol indicator state driven by completed candles.
//!
//! Every indicator is updated incrementally as candles arrive. After each
//! candle the previous `current` snapshot rotates into `previous`, which is
//! what crossover conditions and `_PREV` operands read.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::error::DataError;
use crate::indicators::momentum::{Macd, Rsi};
use crate::indicators::trend::{Adx, Ema, Sma};
use crate::indicators::volatility::{Atr, Bollinger};
use crate::indicators::volume::RelativeVolume;
use crate::indicators::IndicatorId;
use crate::models::{Candle, IndicatorSnapshot, SnapshotPair, Timeframe};

/// Default bound on stored candles per symbol.
pub const DEFAULT_MAX_HISTORY: usize = 250;

const SMA_PERIODS: [(IndicatorId, usize); 5] = [
    (IndicatorId::Ma5, 5),
    (IndicatorId::Ma10, 10),
    (IndicatorId::Ma20, 20),
    (IndicatorId::Ma50, 50),
    (IndicatorId::Ma200, 200),
];

const EMA_PERIODS: [(IndicatorId, usize); 8] = [
    (IndicatorId::Ema6, 6),
    (IndicatorId::Ema9, 9),
    (IndicatorId::Ema10, 10),
    (IndicatorId::Ema12, 12),
    (IndicatorId::Ema20, 20),
    (IndicatorId::Ema26, 26),
    (IndicatorId::Ema50, 50),
    (IndicatorId::Ema200, 200),
];

/// Incremental state for the whole indicator vocabulary.
#[derive(Debug, Clone)]
struct IndicatorBank {
    seen: usize,
    smas: Vec<(IndicatorId, Sma)>,
    emas: Vec<(IndicatorId, Ema)>,
    rsi: Rsi,
    macd: Macd,
    adx5: Adx,
    adx14: Adx,
    atr: Atr,
    bollinger: Bollinger,
    rel_volume: RelativeVolume,
}

impl IndicatorBank {
    fn new() -> Self {
        Self {
            seen: 0,
            smas: SMA_PERIODS.iter().map(|(id, p)| (*id, Sma::new(*p))).collect(),
            emas: EMA_PERIODS.iter().map(|(id, p)| (*id, Ema::new(*p))).collect(),
            rsi: Rsi::new(14),
            macd: Macd::default(),
            adx5: Adx::new(5),
            adx14: Adx::new(14),
            atr: Atr::new(14),
            bollinger: Bollinger::default(),
            rel_volume: RelativeVolume::new(20),
        }
    }

    fn update(&mut self, candle: &Candle) -> IndicatorSnapshot {
        self.seen += 1;
        let mut snapshot = IndicatorSnapshot::new(candle.period_start);
        snapshot.insert(IndicatorId::Price, candle.close);
        snapshot.insert(IndicatorId::Volume, candle.volume);

        for (id, sma) in self.smas.iter_mut() {
            snapshot.insert_opt(*id, sma.update(candle.close));
        }
        for (id, ema) in self.emas.iter_mut() {
            snapshot.insert_opt(*id, ema.update(candle.close));
        }

        snapshot.insert_opt(IndicatorId::Rsi14, self.rsi.update(candle.close));

        let macd = self.macd.update(candle.close);
        snapshot.insert_opt(IndicatorId::Macd, macd.macd);
        snapshot.insert_opt(IndicatorId::MacdSignal, macd.signal);
        snapshot.insert_opt(IndicatorId::MacdHist, macd.histogram);

        snapshot.insert_opt(
            IndicatorId::Adx5,
            self.adx5.update(candle.high, candle.low, candle.close),
        );
        snapshot.insert_opt(
            IndicatorId::Adx14,
            self.adx14.update(candle.high, candle.low, candle.close),
        );
        snapshot.insert_opt(
            IndicatorId::Atr14,
            self.atr.update(candle.high, candle.low, candle.close),
        );

        if let Some(bands) = self.bollinger.update(candle.close) {
            snapshot.insert(IndicatorId::BbUpper, bands.upper);
            snapshot.insert(IndicatorId::BbMiddle, bands.middle);
            snapshot.insert(IndicatorId::BbLower, bands.lower);
        }

        snapshot.insert_opt(IndicatorId::RelVolume20, self.rel_volume.update(candle.volume));

        if let Some(ema20) = snapshot.get(IndicatorId::Ema20).filter(|v| *v != 0.0) {
            snapshot.insert(
                IndicatorId::PriceEma20DiffPct,
                (candle.close - ema20).abs() / ema20,
            );
        }

        let seen = self.seen;
        snapshot.values.retain(|id, _| seen >= id.lookback());
        snapshot
    }
}

#[derive(Debug, Clone)]
struct SymbolIndicators {
    candles: VecDeque<Candle>,
    bank: IndicatorBank,
    pair: SnapshotPair,
    last_period: Option<DateTime<Utc>>,
}

impl SymbolIndicators {
    fn new() -> Self {
        Self {
            candles: VecDeque::new(),
            bank: IndicatorBank::new(),
            pair: SnapshotPair::default(),
            last_period: None,
        }
    }

    fn apply(&mut self, candle: Candle, max_history: usize) {
        let next = self.bank.update(&candle);
        self.last_period = Some(candle.period_start);
        self.candles.push_back(candle);
        while self.candles.len() > max_history {
            self.candles.pop_front();
        }
        let current = std::mem::replace(&mut self.pair.current, next);
        self.pair.previous = current;
    }
}

/// Indicator state and snapshot pairs for every active symbol.
pub struct IndicatorCalculator {
    timeframe: Timeframe,
    max_history: usize,
    symbols: HashMap<String, SymbolIndicators>,
}

impl IndicatorCalculator {
    pub fn new(timeframe: Timeframe, max_history: usize) -> Self {
        Self {
            timeframe,
            max_history: max_history.max(1),
            symbols: HashMap::new(),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Switches timeframe and discards all history.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.symbols.clear();
    }

    /// Applies one completed candle and returns the rotated snapshot pair.
    pub fn on_candle(&mut self, symbol: &str, candle: Candle) -> Result<SnapshotPair, DataError> {
        self.check_candle(symbol, &candle)?;

        let state = self
            .symbols
            .entry(symbol.to_string())
            .or_insert_with(SymbolIndicators::new);

        if let Some(last) = state.last_period {
            if candle.period_start <= last {
                return Err(DataError::Stale {
                    symbol: symbol.to_string(),
                    timestamp: candle.period_start,
                    boundary: last,
                });
            }
        }

        state.apply(candle, self.max_history);
        Ok(state.pair.clone())
    }

    /// Rebuilds `symbol` from historical candles.
    ///
    /// Candles are sorted and de-duplicated by period start. Invalid ones
    /// are skipped. Returns how many candles were loaded.
    pub fn warm_start(&mut self, symbol: &str, history: Vec<Candle>) -> usize {
        let mut history: Vec<Candle> = history
            .into_iter()
            .filter(|c| match self.check_candle(symbol, c) {
                Ok(()) => true,
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "Skipping historical candle");
                    false
                }
            })
            .collect();
        history.sort_by_key(|c| c.period_start);
        history.dedup_by_key(|c| c.period_start);

        let mut state = SymbolIndicators::new();
        let loaded = history.len();
        for mut candle in history {
            candle.completed = true;
            state.apply(candle, self.max_history);
        }

        if loaded == 0 {
            self.symbols.remove(symbol);
        } else {
            self.symbols.insert(symbol.to_string(), state);
        }
        loaded
    }

    pub fn snapshot(&self, symbol: &str) -> Option<SnapshotPair> {
        self.symbols.get(symbol).map(|s| s.pair.clone())
    }

    /// Period start of the newest candle applied for `symbol`.
    pub fn last_period(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.symbols.get(symbol).and_then(|s| s.last_period)
    }

    pub fn candle_count(&self, symbol: &str) -> usize {
        self.symbols.get(symbol).map_or(0, |s| s.candles.len())
    }

    pub fn candles(&self, symbol: &str) -> Vec<Candle> {
        self.symbols
            .get(symbol)
            .map(|s| s.candles.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove_symbol(&mut self, symbol: &str) {
        self.symbols.remove(symbol);
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    fn check_candle(&self, symbol: &str, candle: &Candle) -> Result<(), DataError> {
        if candle.timeframe != self.timeframe {
            return Err(DataError::TimeframeMismatch {
                expected: self.timeframe,
                found: candle.timeframe,
            });
        }
        if candle.symbol != symbol {
            return Err(DataError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("candle belongs to {}", candle.symbol),
            });
        }
        candle.validate()
    }
}
