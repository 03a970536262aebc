//! Feed connection configuration.

use crate::reconnect::ReconnectConfig;
use std::time::Duration;

/// Configuration for one venue feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed endpoint host.
    pub host: String,
    /// Feed endpoint port.
    pub port: u16,
    /// WebSocket path.
    pub path: String,
    /// Timeout for each TCP connect attempt.
    pub connect_timeout: Duration,
    /// Bounded wait for a clean close during shutdown.
    pub close_grace: Duration,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
    /// Capacity of the session command channel.
    pub channel_capacity: usize,
    /// User agent sent with the protocol upgrade.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "ws-subscriptions-clob.polymarket.com".to_string(),
            port: 443,
            path: "/ws/market".to_string(),
            connect_timeout: Duration::from_secs(10),
            close_grace: Duration::from_secs(3),
            reconnect: ReconnectConfig::default(),
            channel_capacity: 64,
            user_agent: concat!("feedforge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedConfig {
    /// Creates a config for the given endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the per-attempt connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the bounded clean-close wait.
    #[must_use]
    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Sets the command channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Returns the wss URL for the protocol upgrade.
    #[must_use]
    pub fn url(&self) -> String {
        format!("wss://{}:{}{}", self.host, self.port, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_market_channel() {
        let config = FeedConfig::default();
        assert_eq!(config.port, 443);
        assert_eq!(config.path, "/ws/market");
        assert_eq!(
            config.url(),
            "wss://ws-subscriptions-clob.polymarket.com:443/ws/market"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = FeedConfig::new("feed.example.com", 8443, "/stream")
            .connect_timeout(Duration::from_secs(3))
            .channel_capacity(16);
        assert_eq!(config.url(), "wss://feed.example.com:8443/stream");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.channel_capacity, 16);
    }
}
