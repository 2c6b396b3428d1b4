//! Market data feed interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use std::pin::Pin;

use crate::error::FeedError;
use crate::models::{Candle, Tick, Timeframe};

/// Live ticks for the subscribed symbols. Ends when the connection drops.
pub type TickStream = Pin<Box<dyn Stream<Item = Result<Tick, FeedError>> + Send>>;

/// Half-open time range `[start, end)` for historical fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The warm-start window for `timeframe` ending at `now`.
    pub fn warm_start(now: DateTime<Utc>, timeframe: Timeframe) -> Self {
        Self::new(now - timeframe.history_window(), now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Completed candles for `symbol` within `range`.
    async fn fetch_history(
        &self,
        symbol: &str,
        range: HistoryRange,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, FeedError>;

    /// Opens a live tick stream for `symbols`.
    async fn subscribe(&self, symbols: &[String]) -> Result<TickStream, FeedError>;
}
