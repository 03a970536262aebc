//! # FeedForge
//!
//! Streaming market-data feed client for Rust.
//!
//! FeedForge holds a persistent secure WebSocket to a venue's market
//! channel, maintains live per-instrument order books, and emits
//! normalized trade events enriched with top-of-book state to a
//! registered callback.
//!
//! ## Features
//!
//! - **Explicit connection lifecycle** - resolve, connect, TLS, protocol
//!   upgrade, subscribe, and stream as observable state transitions
//! - **Automatic reconnection** - deterministic, cancellable delays with
//!   optional bounded backoff; subscriptions re-flushed on every handshake
//! - **Concurrent order books** - guarded bid/ask sides, atomic snapshot
//!   replacement, sentinel top-of-book queries
//! - **Forgiving wire decode** - per-event drop semantics; no frame ever
//!   ends the stream
//!
//! ## Quick Start
//!
//! ```ignore
//! use feedforge::prelude::*;
//!
//! let mut client = FeedClient::builder()
//!     .polymarket(FeedConfig::default())
//!     .event_callback(|event| println!("{} @ {}", event.instrument_id, event.price))
//!     .build();
//!
//! client.subscribe("<token-id>");
//! client.connect().await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - domain types: sides, levels, feed messages, market events
//! - [`codec`] - JSON frame decoding and subscribe-request encoding
//! - [`marketdata`] - concurrent order books and the instrument registry
//! - [`client`] - session state machine, connector, reconnection, façade

pub mod prelude;

/// Core domain types.
pub mod core {
    pub use feedforge_core::*;
}

/// Wire codec.
pub mod codec {
    pub use feedforge_codec::*;
}

/// Order books and the instrument registry.
pub mod marketdata {
    pub use feedforge_marketdata::*;
}

/// Client engine.
pub mod client {
    pub use feedforge_client::*;
}

// Re-export commonly used items at the crate root
pub use feedforge_client::{
    FeedClient, FeedClientBuilder, FeedConfig, PolymarketFeed, ReconnectConfig, SessionState,
    VenueFeed,
};
pub use feedforge_core::{MarketEvent, PriceLevel, Side, TopOfBook, Venue};
pub use feedforge_marketdata::{BookRegistry, OrderBook};
