//! The feed client façade.

use crate::config::FeedConfig;
use crate::error::ClientError;
use crate::feed::{PolymarketFeed, VenueFeed};
use crate::state::SessionState;
use crate::subscriptions::SubscriptionSet;
use feedforge_core::{EventCallback, MarketEvent, TopOfBook, Venue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Builder for composing a [`FeedClient`] from venue feeds.
#[derive(Default)]
pub struct FeedClientBuilder {
    feeds: Vec<Box<dyn VenueFeed>>,
    subscriptions: SubscriptionSet,
    callback: Option<EventCallback>,
}

impl FeedClientBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a venue feed. One feed per venue; the last wins.
    #[must_use]
    pub fn venue(mut self, feed: Box<dyn VenueFeed>) -> Self {
        self.feeds.push(feed);
        self
    }

    /// Adds a Polymarket feed sharing the client's durable subscriptions.
    #[must_use]
    pub fn polymarket(self, config: FeedConfig) -> Self {
        let subscriptions = self.subscriptions.clone();
        self.venue(Box::new(PolymarketFeed::with_subscriptions(
            config,
            subscriptions,
        )))
    }

    /// Registers the event callback.
    #[must_use]
    pub fn event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(MarketEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Builds the client, keying feeds by venue.
    #[must_use]
    pub fn build(self) -> FeedClient {
        let mut feeds: HashMap<Venue, Box<dyn VenueFeed>> = HashMap::new();
        for mut feed in self.feeds {
            if let Some(callback) = &self.callback {
                feed.set_event_callback(Arc::clone(callback));
            }
            if feeds.insert(feed.venue(), feed).is_some() {
                warn!("duplicate venue feed replaced by later registration");
            }
        }
        FeedClient {
            feeds,
            subscriptions: self.subscriptions,
        }
    }
}

/// Public surface of the feed pipeline.
///
/// Owns at most one venue feed per venue (each supervising its own
/// session, so a reconnect attempt can never race another live connection
/// for the same venue) and the durable subscription set that survives
/// reconnects.
pub struct FeedClient {
    feeds: HashMap<Venue, Box<dyn VenueFeed>>,
    subscriptions: SubscriptionSet,
}

impl FeedClient {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder::new()
    }

    /// Registers the event callback on every venue feed.
    ///
    /// Must happen before [`connect`](Self::connect).
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        for feed in self.feeds.values_mut() {
            feed.set_event_callback(Arc::clone(&callback));
        }
    }

    /// Connects every venue feed. A feed that is already live is left
    /// untouched.
    ///
    /// # Errors
    /// Returns [`ClientError::CallbackMissing`] when no callback was
    /// registered before streaming was requested.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        for feed in self.feeds.values_mut() {
            feed.connect().await?;
        }
        Ok(())
    }

    /// Subscribes to an instrument on every venue, durably.
    ///
    /// Before streaming the request is buffered and flushed at the next
    /// successful handshake; while streaming it is sent immediately.
    pub fn subscribe(&mut self, instrument_id: &str) {
        self.subscriptions.add(instrument_id);
        for feed in self.feeds.values_mut() {
            feed.subscribe(instrument_id);
        }
    }

    /// Stops every venue feed. Idempotent; cancels pending reconnect
    /// timers and bounded-waits for clean closes.
    pub async fn stop(&mut self) {
        for feed in self.feeds.values_mut() {
            feed.stop().await;
        }
    }

    /// Returns the durable subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionSet {
        self.subscriptions.clone()
    }

    /// Returns the top of book for an instrument at a venue.
    #[must_use]
    pub fn top_of_book(&self, venue: Venue, instrument_id: &str) -> Option<TopOfBook> {
        self.feeds.get(&venue)?.top_of_book(instrument_id)
    }

    /// Returns a venue's session state, if the venue is configured.
    #[must_use]
    pub fn state(&self, venue: Venue) -> Option<SessionState> {
        self.feeds.get(&venue).map(|feed| feed.state())
    }

    /// Returns the configured venues.
    #[must_use]
    pub fn venues(&self) -> Vec<Venue> {
        self.feeds.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_composes_one_feed_per_venue() {
        let client = FeedClient::builder()
            .polymarket(FeedConfig::default())
            .polymarket(FeedConfig::default())
            .event_callback(|_| {})
            .build();
        assert_eq!(client.venues(), vec![Venue::Polymarket]);
    }

    #[test]
    fn test_subscribe_is_durable_and_shared() {
        let mut client = FeedClient::builder()
            .polymarket(FeedConfig::default())
            .event_callback(|_| {})
            .build();
        client.subscribe("tok-1");
        client.subscribe("tok-1");
        assert_eq!(client.subscriptions().snapshot(), vec!["tok-1"]);
    }

    #[tokio::test]
    async fn test_connect_without_callback_fails_once() {
        let mut client = FeedClient::builder()
            .polymarket(FeedConfig::default())
            .build();
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::CallbackMissing));
    }

    #[tokio::test]
    async fn test_stop_idempotent_without_sessions() {
        let mut client = FeedClient::builder()
            .polymarket(FeedConfig::default())
            .event_callback(|_| {})
            .build();
        client.stop().await;
        client.stop().await;
        assert_eq!(client.state(Venue::Polymarket), Some(SessionState::Idle));
    }
}
