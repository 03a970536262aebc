//! Subscribe-request encoding.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Subscription request for the market channel.
///
/// The server forgets subscription state across a dropped connection, so
/// the full durable set is re-sent on every successful handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Channel discriminator, always `"market"` for this feed.
    #[serde(rename = "type")]
    pub channel: String,
    /// Instrument (token) identifiers to subscribe to.
    pub assets_ids: Vec<String>,
}

impl SubscribeRequest {
    /// Builds a market-channel subscription for the given instruments.
    #[must_use]
    pub fn market<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channel: "market".to_string(),
            assets_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Serializes the request to its wire form.
    #[must_use]
    pub fn to_wire(&self) -> String {
        json!({
            "type": self.channel,
            "assets_ids": self.assets_ids,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_request_wire_form() {
        let req = SubscribeRequest::market(["tok-1", "tok-2"]);
        let wire = req.to_wire();
        let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value["type"], "market");
        assert_eq!(value["assets_ids"][0], "tok-1");
        assert_eq!(value["assets_ids"][1], "tok-2");
    }

    #[test]
    fn test_empty_request() {
        let req = SubscribeRequest::market(Vec::<String>::new());
        assert_eq!(req.assets_ids.len(), 0);
        let value: serde_json::Value = serde_json::from_str(&req.to_wire()).unwrap();
        assert!(value["assets_ids"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_round_trips_through_serde() {
        let req = SubscribeRequest::market(["tok-1"]);
        let parsed: SubscribeRequest = serde_json::from_str(&req.to_wire()).unwrap();
        assert_eq!(parsed, req);
    }
}
