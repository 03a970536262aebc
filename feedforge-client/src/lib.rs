//! # FeedForge Client
//!
//! Client engine for streaming market-data feeds.
//!
//! This crate provides:
//! - The connection lifecycle state machine and its async session driver
//! - A pluggable secure-transport connector (TCP + TLS + WebSocket upgrade)
//! - Reconnection with a deterministic, cancellable delay
//! - Durable subscriptions, re-flushed on every successful handshake
//! - The venue feed capability trait, its Polymarket implementation, and
//!   the `FeedClient` façade composing them
//! - One-shot instrument discovery over HTTPS

pub mod client;
pub mod config;
pub mod connector;
pub mod discovery;
pub mod error;
pub mod feed;
pub mod reconnect;
pub mod session;
pub mod state;
pub mod subscriptions;

pub use client::{FeedClient, FeedClientBuilder};
pub use config::FeedConfig;
pub use connector::{FeedConnector, WssConnector};
pub use discovery::{MarketInfo, fetch_markets};
pub use error::{ClientError, ConnectStep};
pub use feed::{PolymarketFeed, VenueFeed};
pub use reconnect::{ReconnectConfig, ReconnectState};
pub use session::{ConnectionSession, SessionCommand, SessionHandle};
pub use state::{SessionFsm, SessionState};
pub use subscriptions::SubscriptionSet;
