//! Instrument discovery over HTTPS.
//!
//! One-shot metadata fetch used by wiring code to find instrument (token)
//! ids worth subscribing to. Failures surface immediately and are never
//! retried here.

use crate::error::ClientError;
use serde::Deserialize;
use tracing::debug;

/// Default metadata endpoint.
pub const DEFAULT_METADATA_URL: &str = "https://gamma-api.polymarket.com";

/// Venue market metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketInfo {
    /// Venue market identifier.
    pub id: String,
    /// Market question, when provided.
    #[serde(default)]
    pub question: Option<String>,
    /// Whether the market is accepting orders.
    #[serde(default)]
    pub active: bool,
    /// Whether the market has resolved.
    #[serde(default)]
    pub closed: bool,
    /// Token ids, double-encoded as a JSON string by the venue.
    #[serde(rename = "clobTokenIds", default)]
    clob_token_ids_raw: Option<String>,
}

impl MarketInfo {
    /// Returns the market's instrument (token) ids.
    ///
    /// The venue serializes these as a JSON array inside a JSON string;
    /// an unparseable field yields an empty list rather than an error.
    #[must_use]
    pub fn instrument_ids(&self) -> Vec<String> {
        self.clob_token_ids_raw
            .as_ref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default()
    }
}

/// Fetches active market metadata from the venue, one shot.
///
/// # Errors
/// Returns [`ClientError::Discovery`] on request, status, or decode
/// failure.
pub async fn fetch_markets(base_url: &str, limit: usize) -> Result<Vec<MarketInfo>, ClientError> {
    let url = format!(
        "{}/markets?active=true&closed=false&limit={limit}",
        base_url.trim_end_matches('/')
    );
    debug!(%url, "fetching market metadata");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| ClientError::discovery(e.to_string()))?
        .error_for_status()
        .map_err(|e| ClientError::discovery(e.to_string()))?;

    response
        .json::<Vec<MarketInfo>>()
        .await
        .map_err(|e| ClientError::discovery(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_ids_parse_double_encoding() {
        let market: MarketInfo = serde_json::from_str(
            r#"{"id":"123","question":"Will it rain?","active":true,"closed":false,
                "clobTokenIds":"[\"tok-yes\",\"tok-no\"]"}"#,
        )
        .unwrap();
        assert_eq!(market.instrument_ids(), vec!["tok-yes", "tok-no"]);
        assert!(market.active);
    }

    #[test]
    fn test_missing_token_ids_yield_empty() {
        let market: MarketInfo = serde_json::from_str(r#"{"id":"123"}"#).unwrap();
        assert!(market.instrument_ids().is_empty());
        assert!(!market.active);
    }

    #[test]
    fn test_garbled_token_ids_yield_empty() {
        let market: MarketInfo =
            serde_json::from_str(r#"{"id":"123","clobTokenIds":"not json"}"#).unwrap();
        assert!(market.instrument_ids().is_empty());
    }
}
