//! Live ticks over a JSON WebSocket, history over HTTP.

use async_trait::async_trait;
use chrono::DateTime;
use futures_util::{future, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

use crate::error::FeedError;
use crate::models::{Candle, Tick, Timeframe};
use crate::services::market_data::{HistoryRange, MarketDataFeed, TickStream};
use crate::services::rest::HistoryClient;

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    op: &'static str,
    symbols: &'a [String],
}

#[derive(Debug, Deserialize)]
struct WireTick {
    symbol: String,
    /// Epoch milliseconds.
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Decodes one text frame into a tick.
pub fn decode_tick(text: &str) -> Result<Tick, FeedError> {
    let wire: WireTick = serde_json::from_str(text)?;
    let timestamp = DateTime::from_timestamp_millis(wire.timestamp).ok_or_else(|| {
        FeedError::Protocol(format!("tick timestamp out of range: {}", wire.timestamp))
    })?;
    Ok(Tick::new(
        wire.symbol.to_uppercase(),
        timestamp,
        wire.open,
        wire.high,
        wire.low,
        wire.close,
        wire.volume,
    ))
}

pub struct WebSocketFeed {
    ws_url: Url,
    history: HistoryClient,
}

impl WebSocketFeed {
    pub fn new(ws_url: &str, http_url: &str) -> Result<Self, FeedError> {
        Ok(Self {
            ws_url: Url::parse(ws_url)?,
            history: HistoryClient::new(http_url)?,
        })
    }
}

#[async_trait]
impl MarketDataFeed for WebSocketFeed {
    async fn fetch_history(
        &self,
        symbol: &str,
        range: HistoryRange,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, FeedError> {
        self.history.fetch_candles(symbol, range, timeframe).await
    }

    async fn subscribe(&self, symbols: &[String]) -> Result<TickStream, FeedError> {
        let (mut ws, _) = connect_async(self.ws_url.as_str()).await?;

        let request = serde_json::to_string(&SubscribeRequest {
            op: "subscribe",
            symbols,
        })?;
        ws.send(Message::Text(request)).await?;
        info!(url = %self.ws_url, symbols = ?symbols, "Subscribed to live feed");

        let stream = ws
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => match decode_tick(&text) {
                        Ok(tick) => Some(Ok(tick)),
                        Err(e) => {
                            warn!(error = %e, "Skipping undecodable feed message");
                            None
                        }
                    },
                    Ok(_) => None,
                    Err(e) => Some(Err(FeedError::from(e))),
                }
            });

        Ok(Box::pin(stream))
    }
}
