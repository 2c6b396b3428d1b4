//! Destinations for signals and status updates.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::{EngineStatus, Signal};

pub trait SignalSink: Send + Sync {
    fn record(&self, signal: &Signal);
}

pub trait StatusSink: Send + Sync {
    fn report(&self, status: &EngineStatus);
}

/// Writes every event to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SignalSink for TracingSink {
    fn record(&self, signal: &Signal) {
        info!(
            symbol = %signal.symbol,
            kind = %signal.signal_kind,
            price = signal.price,
            rule_id = %signal.rule_id,
            rule = %signal.rule_name,
            timestamp = %signal.timestamp,
            "Signal emitted"
        );
    }
}

impl StatusSink for TracingSink {
    fn report(&self, status: &EngineStatus) {
        match &status.degraded_reason {
            Some(reason) => warn!(
                running = status.is_running,
                connected = status.is_connected,
                reconnect_attempts = status.reconnect_attempts,
                reason = %reason,
                "Engine degraded"
            ),
            None => info!(
                running = status.is_running,
                connected = status.is_connected,
                symbols = ?status.active_symbols,
                timeframe = %status.timeframe,
                "Engine status"
            ),
        }
    }
}

/// Forwards events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> ChannelSink<T> {
    pub fn new(tx: mpsc::UnboundedSender<T>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

// A dropped receiver only means nobody is listening anymore.
impl SignalSink for ChannelSink<Signal> {
    fn record(&self, signal: &Signal) {
        let _ = self.tx.send(signal.clone());
    }
}

impl StatusSink for ChannelSink<EngineStatus> {
    fn report(&self, status: &EngineStatus) {
        let _ = self.tx.send(status.clone());
    }
}
