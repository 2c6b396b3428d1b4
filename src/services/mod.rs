//! Market data feeds.

pub mod market_data;
pub mod replay;
pub mod rest;
pub mod websocket;

pub use market_data::{HistoryRange, MarketDataFeed, TickStream};
pub use replay::{ReplayFeed, ReplaySession};
pub use rest::HistoryClient;
pub use websocket::WebSocketFeed;
