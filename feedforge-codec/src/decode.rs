//! Frame decoding and dispatch.

use crate::error::{DecodeError, excerpt};
use feedforge_core::{BookSnapshot, FeedMessage, LevelUpdate, PriceLevel, Side, TradeUpdate};
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use tracing::{debug, warn};

/// Per-connection decode counters.
///
/// Reset with the decoder itself, one per connection attempt; logged by the
/// session at disconnect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames handed to the decoder.
    pub frames: u64,
    /// Typed events produced.
    pub events: u64,
    /// Events dropped for missing/non-numeric required fields.
    pub skipped_events: u64,
    /// Whole frames rejected as malformed.
    pub frame_errors: u64,
}

/// Turns one raw protocol frame into zero or more typed feed messages.
///
/// A frame is either a single JSON object or an array of objects; objects
/// are processed in array order. Each object is dispatched on its
/// `event_type` discriminator. Failures are scoped: a malformed frame is
/// one returned error, a bad event inside a frame drops that event only.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    stats: DecoderStats,
}

impl MessageDecoder {
    /// Creates a decoder with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Decodes one frame into feed messages, in arrival order.
    ///
    /// # Errors
    /// Returns [`DecodeError::Frame`] for unparseable JSON and
    /// [`DecodeError::UnsupportedFrame`] for a frame that is neither an
    /// object nor an array. Both are scoped to this frame: the caller logs
    /// and continues the stream.
    pub fn decode(&mut self, raw: &str) -> Result<Vec<FeedMessage>, DecodeError> {
        self.stats.frames += 1;

        let value: Value = serde_json::from_str(raw).map_err(|source| {
            self.stats.frame_errors += 1;
            DecodeError::Frame {
                source,
                excerpt: excerpt(raw),
            }
        })?;

        let mut out = Vec::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    self.decode_object(item, &mut out);
                }
            }
            item @ Value::Object(_) => self.decode_object(item, &mut out),
            _ => {
                self.stats.frame_errors += 1;
                return Err(DecodeError::UnsupportedFrame {
                    excerpt: excerpt(raw),
                });
            }
        }

        self.stats.events += out.len() as u64;
        Ok(out)
    }

    fn decode_object(&mut self, item: Value, out: &mut Vec<FeedMessage>) {
        // Venue-reported failures arrive as {"type": "error", ...}. They are
        // operator warnings, not domain events.
        if item.get("type").and_then(Value::as_str) == Some("error") {
            warn!(payload = %excerpt(&item.to_string()), "venue error frame");
            return;
        }

        // An object without the discriminator yields zero events, no error.
        let Some(event_type) = item.get("event_type").and_then(Value::as_str) else {
            return;
        };

        match event_type {
            "book" => match decode_snapshot(&item) {
                Ok(msg) => out.push(msg),
                Err(e) => self.drop_event(&e),
            },
            "price_change" => self.decode_price_changes(&item, out),
            "last_trade_price" => match decode_trade(&item) {
                Ok(msg) => out.push(msg),
                Err(e) => self.drop_event(&e),
            },
            other => {
                debug!(event_type = other, "ignoring unrecognized event type");
            }
        }
    }

    fn decode_price_changes(&mut self, item: &Value, out: &mut Vec<FeedMessage>) {
        let envelope: RawPriceChangeEnvelope = match from_object(item, "price_change") {
            Ok(env) => env,
            Err(e) => return self.drop_event(&e),
        };

        // Each delta decodes independently: one bad entry never drops its
        // siblings, and output preserves array order.
        for delta in &envelope.price_changes {
            match decode_delta(delta, envelope.asset_id.as_deref()) {
                Ok(msg) => out.push(msg),
                Err(e) => self.drop_event(&e),
            }
        }
    }

    fn drop_event(&mut self, err: &DecodeError) {
        self.stats.skipped_events += 1;
        warn!(error = %err, "skipping undecodable event");
    }
}

fn from_object<'de, T: Deserialize<'de>>(
    item: &Value,
    context: &'static str,
) -> Result<T, DecodeError> {
    T::deserialize(item.clone()).map_err(|e| DecodeError::Event {
        context,
        reason: e.to_string(),
        excerpt: excerpt(&item.to_string()),
    })
}

fn decode_snapshot(item: &Value) -> Result<FeedMessage, DecodeError> {
    let raw: RawBook = from_object(item, "book")?;
    Ok(FeedMessage::Snapshot(BookSnapshot {
        instrument_id: raw.asset_id,
        bids: raw.bids.into_iter().map(RawLevel::into_level).collect(),
        asks: raw.asks.into_iter().map(RawLevel::into_level).collect(),
        timestamp_exchange: raw.timestamp,
    }))
}

fn decode_trade(item: &Value) -> Result<FeedMessage, DecodeError> {
    let raw: RawTrade = from_object(item, "last_trade_price")?;
    let side = parse_side(&raw.side, item, "last_trade_price")?;
    Ok(FeedMessage::Trade(TradeUpdate {
        instrument_id: raw.asset_id,
        price: raw.price,
        size: raw.size,
        side,
        timestamp_exchange: raw.timestamp,
        raw_payload: item.to_string(),
    }))
}

fn decode_delta(delta: &Value, envelope_asset: Option<&str>) -> Result<FeedMessage, DecodeError> {
    let raw: RawDelta = from_object(delta, "price_change")?;
    let side = parse_side(&raw.side, delta, "price_change")?;
    let instrument_id = match raw.asset_id.or_else(|| envelope_asset.map(String::from)) {
        Some(id) => id,
        None => {
            return Err(DecodeError::Event {
                context: "price_change",
                reason: "missing asset_id".to_string(),
                excerpt: excerpt(&delta.to_string()),
            });
        }
    };
    Ok(FeedMessage::LevelChange(LevelUpdate {
        instrument_id,
        side,
        price: raw.price,
        size: raw.size,
    }))
}

fn parse_side(s: &str, item: &Value, context: &'static str) -> Result<Side, DecodeError> {
    Side::parse_wire(s).ok_or_else(|| DecodeError::Event {
        context,
        reason: format!("unknown side {s:?}"),
        excerpt: excerpt(&item.to_string()),
    })
}

/// Accepts a JSON number or a numeric string, normalizing to f64.
fn num_or_str<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("number out of f64 range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("non-numeric value {s:?}"))),
        other => Err(de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

/// Like [`num_or_str`], for millisecond timestamps. Absent fields default
/// to 0 upstream via `#[serde(default)]`.
fn millis_or_str<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .ok_or_else(|| de::Error::custom("timestamp out of range")),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("non-numeric timestamp {s:?}"))),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(deserialize_with = "num_or_str")]
    price: f64,
    #[serde(deserialize_with = "num_or_str")]
    size: f64,
}

impl RawLevel {
    fn into_level(self) -> PriceLevel {
        PriceLevel {
            price: self.price,
            size: self.size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBook {
    asset_id: String,
    #[serde(default)]
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
    #[serde(default, deserialize_with = "millis_or_str")]
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
struct RawPriceChangeEnvelope {
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default, alias = "changes")]
    price_changes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(deserialize_with = "num_or_str")]
    price: f64,
    #[serde(deserialize_with = "num_or_str")]
    size: f64,
    side: String,
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    asset_id: String,
    #[serde(deserialize_with = "num_or_str")]
    price: f64,
    #[serde(deserialize_with = "num_or_str")]
    size: f64,
    side: String,
    #[serde(default, deserialize_with = "millis_or_str")]
    timestamp: u64,
}
