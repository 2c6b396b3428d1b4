//! Historical candles over HTTP.

use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::FeedError;
use crate::models::{Candle, Timeframe};
use crate::services::market_data::HistoryRange;

#[derive(Debug, Deserialize)]
struct WireCandle {
    /// Epoch milliseconds.
    period_start: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

pub struct HistoryClient {
    client: Client,
    endpoint: Url,
}

impl HistoryClient {
    pub fn new(base_url: &str) -> Result<Self, FeedError> {
        let endpoint = Url::parse(&format!("{}/candles", base_url.trim_end_matches('/')))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    /// `GET {base}/candles?symbol=&timeframe=&start=&end=` with millisecond bounds.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        range: HistoryRange,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, FeedError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("timeframe", timeframe.as_str())
            .append_pair("start", &range.start.timestamp_millis().to_string())
            .append_pair("end", &range.end.timestamp_millis().to_string());

        debug!(symbol = %symbol, timeframe = %timeframe, url = %url, "Fetching candle history");

        let rows: Vec<WireCandle> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total = rows.len();
        let candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(|row| {
                let start = DateTime::from_timestamp_millis(row.period_start)?;
                Some(Candle::completed(
                    symbol,
                    timeframe,
                    timeframe.align(start),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume,
                ))
            })
            .collect();

        if candles.len() < total {
            warn!(
                symbol = %symbol,
                dropped = total - candles.len(),
                "Dropped history rows with out-of-range timestamps"
            );
        }
        Ok(candles)
    }
}
