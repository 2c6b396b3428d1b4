//! In-memory feed driven by a script of sessions.
//!
//! Each `subscribe` call consumes the next queued session. When the queue is
//! empty an open session with no preloaded ticks is used. Ticks can also be
//! pushed into the currently open session at any time.

use async_trait::async_trait;
use futures_util::stream;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::FeedError;
use crate::models::{Candle, Tick, Timeframe};
use crate::services::market_data::{HistoryRange, MarketDataFeed, TickStream};

type LiveSender = mpsc::UnboundedSender<Result<Tick, FeedError>>;

#[derive(Debug, Clone)]
pub enum ReplaySession {
    /// Delivers the ticks, then stays connected.
    Open(Vec<Tick>),
    /// Delivers the ticks, then ends the stream.
    Closing(Vec<Tick>),
    /// The connection attempt fails.
    Refuse,
}

#[derive(Default)]
struct ReplayState {
    history: HashMap<String, Vec<Candle>>,
    failing_history: HashSet<String>,
    sessions: VecDeque<ReplaySession>,
    live: Option<LiveSender>,
    subscribe_calls: usize,
    history_calls: usize,
}

#[derive(Clone, Default)]
pub struct ReplayFeed {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.state.lock().history.insert(symbol.to_string(), candles);
        self
    }

    /// Makes history fetches for `symbol` fail.
    pub fn fail_history(&self, symbol: &str) {
        self.state.lock().failing_history.insert(symbol.to_string());
    }

    pub fn queue_session(&self, session: ReplaySession) {
        self.state.lock().sessions.push_back(session);
    }

    pub fn refuse_connections(&self, count: usize) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.sessions.push_back(ReplaySession::Refuse);
        }
    }

    /// Sends a tick on the open session. Returns false when none is open.
    pub fn push(&self, tick: Tick) -> bool {
        self.send(Ok(tick))
    }

    /// Injects a stream error on the open session.
    pub fn fail(&self, reason: &str) -> bool {
        self.send(Err(FeedError::Disconnected(reason.to_string())))
    }

    /// Ends the open session's stream.
    pub fn disconnect(&self) {
        self.state.lock().live = None;
    }

    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .live
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    pub fn history_calls(&self) -> usize {
        self.state.lock().history_calls
    }

    fn send(&self, item: Result<Tick, FeedError>) -> bool {
        let state = self.state.lock();
        match &state.live {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MarketDataFeed for ReplayFeed {
    async fn fetch_history(
        &self,
        symbol: &str,
        range: HistoryRange,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, FeedError> {
        let mut state = self.state.lock();
        state.history_calls += 1;
        if state.failing_history.contains(symbol) {
            return Err(FeedError::Unreachable(format!("history for {} unavailable", symbol)));
        }
        Ok(state
            .history
            .get(symbol)
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.timeframe == timeframe && range.contains(c.period_start))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, _symbols: &[String]) -> Result<TickStream, FeedError> {
        let mut state = self.state.lock();
        state.subscribe_calls += 1;
        state.live = None;

        let session = state
            .sessions
            .pop_front()
            .unwrap_or_else(|| ReplaySession::Open(Vec::new()));

        let (tx, rx) = mpsc::unbounded_channel();
        let (ticks, keep_open) = match session {
            ReplaySession::Refuse => {
                return Err(FeedError::Unreachable("connection refused".to_string()))
            }
            ReplaySession::Open(ticks) => (ticks, true),
            ReplaySession::Closing(ticks) => (ticks, false),
        };
        for tick in ticks {
            let _ = tx.send(Ok(tick));
        }
        if keep_open {
            state.live = Some(tx);
        }

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }
}
