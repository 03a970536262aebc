//! Venue feed capability and the Polymarket implementation.

use crate::config::FeedConfig;
use crate::connector::WssConnector;
use crate::error::ClientError;
use crate::session::{ConnectionSession, SessionHandle};
use crate::state::SessionState;
use crate::subscriptions::SubscriptionSet;
use async_trait::async_trait;
use feedforge_core::{EventCallback, TopOfBook, Venue};
use feedforge_marketdata::BookRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// The capability set every venue feed implements.
///
/// One concrete implementation exists per venue; the façade composes them
/// by injection. Subscribe requests made before `connect` are buffered in
/// the durable set and flushed at the first successful handshake.
#[async_trait]
pub trait VenueFeed: Send + Sync {
    /// The venue this feed serves.
    fn venue(&self) -> Venue;

    /// Registers the event callback. Must happen before `connect`.
    fn set_event_callback(&mut self, callback: EventCallback);

    /// Starts the feed's session unless one is already live.
    ///
    /// # Errors
    /// Returns [`ClientError::CallbackMissing`] when no callback was
    /// registered: a fatal configuration error, surfaced once and never
    /// retried.
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Subscribes to an instrument, durably.
    fn subscribe(&mut self, instrument_id: &str);

    /// Drives the feed until its session ends (stop or attempt
    /// exhaustion), connecting first if necessary.
    ///
    /// # Errors
    /// Propagates the session's terminal error.
    async fn run(&mut self) -> Result<(), ClientError>;

    /// Stops the feed. Idempotent; cancels any pending reconnect and
    /// bounded-waits for a clean close.
    async fn stop(&mut self);

    /// Returns the current top of book for an instrument, if tracked.
    fn top_of_book(&self, instrument_id: &str) -> Option<TopOfBook>;

    /// Returns the session's current lifecycle state.
    fn state(&self) -> SessionState;
}

/// Polymarket CLOB market-channel feed.
pub struct PolymarketFeed {
    config: FeedConfig,
    subscriptions: SubscriptionSet,
    registry: Arc<BookRegistry>,
    callback: Option<EventCallback>,
    handle: Option<SessionHandle>,
}

impl PolymarketFeed {
    /// Creates a feed with its own subscription set.
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        Self::with_subscriptions(config, SubscriptionSet::new())
    }

    /// Creates a feed sharing an externally-owned subscription set.
    #[must_use]
    pub fn with_subscriptions(config: FeedConfig, subscriptions: SubscriptionSet) -> Self {
        Self {
            config,
            subscriptions,
            registry: Arc::new(BookRegistry::new()),
            callback: None,
            handle: None,
        }
    }

    /// Returns the feed's book registry.
    #[must_use]
    pub fn registry(&self) -> Arc<BookRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns the feed's durable subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionSet {
        self.subscriptions.clone()
    }

    fn session_live(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[async_trait]
impl VenueFeed for PolymarketFeed {
    fn venue(&self) -> Venue {
        Venue::Polymarket
    }

    fn set_event_callback(&mut self, callback: EventCallback) {
        self.callback = Some(callback);
    }

    async fn connect(&mut self) -> Result<(), ClientError> {
        // At most one live session per venue: a second connect while the
        // task is alive must never race a reconnect against it.
        if self.session_live() {
            debug!(venue = %self.venue(), "connect ignored, session already live");
            return Ok(());
        }

        let callback = self
            .callback
            .clone()
            .ok_or(ClientError::CallbackMissing)?;
        let connector = Arc::new(WssConnector::new()?);

        let handle = ConnectionSession::spawn(
            self.venue(),
            self.config.clone(),
            connector,
            self.subscriptions.clone(),
            Arc::clone(&self.registry),
            callback,
        );
        self.handle = Some(handle);
        info!(venue = %self.venue(), "session started");
        Ok(())
    }

    fn subscribe(&mut self, instrument_id: &str) {
        if self.subscriptions.add(instrument_id) {
            info!(venue = %self.venue(), instrument = %instrument_id, "subscription added");
        }
        if let Some(handle) = &self.handle {
            handle.subscribe(instrument_id);
        }
    }

    async fn run(&mut self) -> Result<(), ClientError> {
        self.connect().await?;
        match self.handle.take() {
            Some(handle) => handle.join().await,
            None => Ok(()),
        }
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop(self.config.close_grace * 2).await;
            info!(venue = %self.venue(), "session stopped");
        }
    }

    fn top_of_book(&self, instrument_id: &str) -> Option<TopOfBook> {
        self.registry.get(instrument_id).map(|book| book.top_of_book())
    }

    fn state(&self) -> SessionState {
        self.handle
            .as_ref()
            .map_or(SessionState::Idle, SessionHandle::state)
    }
}
