//! Domain types for the feed pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Minimum size treated as a real resting level.
///
/// Levels at or below this threshold are absent from the book, never stored
/// as zero; the margin absorbs floating-point noise in venue payloads.
pub const SIZE_EPSILON: f64 = 1e-9;

/// Market data venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Polymarket CLOB market channel.
    Polymarket,
}

impl Venue {
    /// Returns the short label used in logs and exported events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Polymarket => "polymarket",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid (buy) side.
    Bid,
    /// Ask (sell) side.
    Ask,
}

impl Side {
    /// Parses the side spellings the wire protocol uses.
    ///
    /// Accepts taker-side trade labels (`BUY`/`SELL`) and book-side keys
    /// (`bids`/`asks`), case-insensitively. Returns `None` for anything else.
    #[must_use]
    pub fn parse_wire(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("buy") || s.eq_ignore_ascii_case("bids") || s.eq_ignore_ascii_case("bid") {
            Some(Side::Bid)
        } else if s.eq_ignore_ascii_case("sell") || s.eq_ignore_ascii_case("asks") || s.eq_ignore_ascii_case("ask") {
            Some(Side::Ask)
        } else {
            None
        }
    }

    /// Returns true for the bid side.
    #[must_use]
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

/// One side's quote at a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: f64,
    /// Resting size at this price.
    pub size: f64,
}

/// Best bid and ask with their sizes.
///
/// `None` is the defined empty sentinel for a side with no levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TopOfBook {
    /// Best (highest) bid, if any.
    pub bid: Option<PriceLevel>,
    /// Best (lowest) ask, if any.
    pub ask: Option<PriceLevel>,
}

impl TopOfBook {
    /// Returns true when best bid >= best ask.
    ///
    /// A crossed top is a tolerated transient (venue resync, stale side),
    /// queryable but never treated as corruption.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Returns the mid price when both sides are present.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }
}

/// Full replacement of one instrument's book state.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    /// Instrument (token) identifier.
    pub instrument_id: String,
    /// Bid levels, any order.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, any order.
    pub asks: Vec<PriceLevel>,
    /// Exchange timestamp in milliseconds, 0 if absent.
    pub timestamp_exchange: u64,
}

/// Incremental upsert/removal of one price level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelUpdate {
    /// Instrument (token) identifier.
    pub instrument_id: String,
    /// Book side the delta applies to.
    pub side: Side,
    /// Level price.
    pub price: f64,
    /// New absolute size; at or below [`SIZE_EPSILON`] removes the level.
    pub size: f64,
}

/// A trade print, no level data.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeUpdate {
    /// Instrument (token) identifier.
    pub instrument_id: String,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: f64,
    /// Taker side.
    pub side: Side,
    /// Exchange timestamp in milliseconds, 0 if absent.
    pub timestamp_exchange: u64,
    /// Raw wire payload of the trade object, carried into the emitted
    /// event for diagnostics.
    pub raw_payload: String,
}

/// One decoded domain event from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Full book replacement for one instrument.
    Snapshot(BookSnapshot),
    /// Single level delta to merge into the existing book.
    LevelChange(LevelUpdate),
    /// Trade print.
    Trade(TradeUpdate),
}

impl FeedMessage {
    /// Returns the instrument this message applies to.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        match self {
            FeedMessage::Snapshot(s) => &s.instrument_id,
            FeedMessage::LevelChange(u) => &u.instrument_id,
            FeedMessage::Trade(t) => &t.instrument_id,
        }
    }
}

/// Normalized trade event delivered to the event callback.
///
/// Always fully populated: partially-decodable wire events are dropped
/// upstream, never emitted incomplete. The embedded top-of-book reflects
/// every book update decoded from the same frame before this trade.
#[derive(Debug, Clone, Serialize)]
pub struct MarketEvent {
    /// Originating venue.
    pub venue: Venue,
    /// Instrument (token) identifier.
    pub instrument_id: String,
    /// Exchange timestamp in milliseconds.
    pub timestamp_exchange: u64,
    /// Local receive timestamp in milliseconds.
    ///
    /// Expected >= `timestamp_exchange`, but clock skew is tolerated.
    pub timestamp_received: u64,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: f64,
    /// Taker side.
    pub side: Side,
    /// Best bid at emission time, `None` when the side is empty.
    pub best_bid: Option<PriceLevel>,
    /// Best ask at emission time, `None` when the side is empty.
    pub best_ask: Option<PriceLevel>,
    /// Raw wire payload of the trade object, for diagnostics.
    pub raw_payload: String,
}

/// Callback invoked once per decoded trade event, synchronously on the
/// session's processing context.
pub type EventCallback = Arc<dyn Fn(MarketEvent) + Send + Sync>;
