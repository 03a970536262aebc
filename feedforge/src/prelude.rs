//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! ```ignore
//! use feedforge::prelude::*;
//! ```

// Core types
pub use feedforge_core::{
    BookSnapshot, EventCallback, FeedMessage, LevelUpdate, MarketEvent, PriceLevel, SIZE_EPSILON,
    Side, TopOfBook, TradeUpdate, Venue, now_millis,
};

// Codec types
pub use feedforge_codec::{DecodeError, DecoderStats, MessageDecoder, SubscribeRequest};

// Market data types
pub use feedforge_marketdata::{BookRegistry, OrderBook};

// Client types
pub use feedforge_client::discovery::{DEFAULT_METADATA_URL, MarketInfo, fetch_markets};
pub use feedforge_client::{
    ClientError, ConnectStep, FeedClient, FeedClientBuilder, FeedConfig, FeedConnector,
    PolymarketFeed, ReconnectConfig, SessionState, SubscriptionSet, VenueFeed, WssConnector,
};
