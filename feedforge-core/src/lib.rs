//! # FeedForge Core
//!
//! Core domain types shared across the FeedForge workspace.
//!
//! This crate provides:
//! - Book primitives: sides, price levels, top-of-book snapshots
//! - Decoded feed messages (snapshot / level change / trade)
//! - Normalized market events delivered to event callbacks
//! - The wall-clock helper used for receive timestamps

pub mod clock;
pub mod types;

pub use clock::now_millis;
pub use types::{
    BookSnapshot, EventCallback, FeedMessage, LevelUpdate, MarketEvent, PriceLevel, SIZE_EPSILON,
    Side, TopOfBook, TradeUpdate, Venue,
};
