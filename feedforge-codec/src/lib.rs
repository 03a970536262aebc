//! # FeedForge Codec
//!
//! Wire codec for the streaming market channel.
//!
//! This crate provides:
//! - Frame decoding: one raw JSON frame into zero or more typed feed
//!   messages, in arrival order, with per-event drop semantics
//! - Subscribe-request encoding
//! - Per-connection decode statistics

pub mod decode;
pub mod error;
pub mod subscribe;

pub use decode::{DecoderStats, MessageDecoder};
pub use error::DecodeError;
pub use subscribe::SubscribeRequest;
