//! Ticks, candles and timeframes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::DataError;

/// Candle period. Durations are fixed; alignment is to the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported timeframe: {0} (expected one of 1m, 5m, 15m, 1h, 4h, 1d)")]
pub struct UnsupportedTimeframe(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn seconds(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3_600,
            Timeframe::H4 => 14_400,
            Timeframe::D1 => 86_400,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// How far back the warm-start fetch reaches for this timeframe.
    ///
    /// Coarser timeframes need longer windows to cover the 200-candle
    /// indicators once non-trading hours are taken out.
    pub fn history_window(self) -> Duration {
        match self {
            Timeframe::M1 => Duration::days(1),
            Timeframe::M5 => Duration::days(5),
            Timeframe::M15 => Duration::days(14),
            Timeframe::H1 => Duration::days(60),
            Timeframe::H4 => Duration::days(180),
            Timeframe::D1 => Duration::days(365),
        }
    }

    /// Start of the period containing `timestamp`.
    pub fn align(self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.seconds();
        let start = timestamp.timestamp().div_euclid(secs) * secs;
        DateTime::from_timestamp(start, 0).unwrap_or(timestamp)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::M1
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = UnsupportedTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnsupportedTimeframe(s.to_string()))
    }
}

/// A raw bar as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Tick {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A single trade print: open, high, low and close are all `price`.
    pub fn trade(symbol: impl Into<String>, timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self::new(symbol, timestamp, price, price, price, price, volume)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        validate_bar(&self.symbol, self.open, self.high, self.low, self.close, self.volume)
    }
}

/// OHLCV aggregate over one timeframe period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub period_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub completed: bool,
}

impl Candle {
    /// A completed candle, typically from a historical fetch.
    #[allow(clippy::too_many_arguments)]
    pub fn completed(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        period_start: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            period_start,
            open,
            high,
            low,
            close,
            volume,
            completed: true,
        }
    }

    /// Opens an in-progress candle from the first tick of a period.
    pub(crate) fn open_with(tick: &Tick, timeframe: Timeframe, period_start: DateTime<Utc>) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            timeframe,
            period_start,
            open: tick.close,
            high: tick.close,
            low: tick.close,
            close: tick.close,
            volume: tick.volume,
            completed: false,
        }
    }

    pub(crate) fn absorb(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.high);
        self.low = self.low.min(tick.low);
        self.close = tick.close;
        self.volume += tick.volume;
    }

    pub fn period_end(&self) -> DateTime<Utc> {
        self.period_start + self.timeframe.duration()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        validate_bar(&self.symbol, self.open, self.high, self.low, self.close, self.volume)
    }
}

fn validate_bar(symbol: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Result<(), DataError> {
    let malformed = |reason: String| DataError::Malformed {
        symbol: symbol.to_string(),
        reason,
    };

    for (name, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(malformed(format!("{} must be a positive number, got {}", name, value)));
        }
    }
    if high < low {
        return Err(malformed(format!("high {} is below low {}", high, low)));
    }
    if !volume.is_finite() || volume < 0.0 {
        return Err(malformed(format!("volume must be non-negative, got {}", volume)));
    }
    Ok(())
}
