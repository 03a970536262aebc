//! # FeedForge Market Data
//!
//! Live order-book state for streaming feeds.
//!
//! This crate provides:
//! - A thread-safe per-instrument order book with epsilon-gated levels,
//!   atomic snapshot replacement, and sentinel top-of-book queries
//! - A registry creating books on first reference and keeping them for
//!   the process lifetime

pub mod book;
pub mod registry;

pub use book::OrderBook;
pub use registry::BookRegistry;
