//! Reconnection policy.

use std::time::Duration;

/// Configuration for reconnection behavior.
///
/// The default is the feed's fixed 2-second delay (`backoff_multiplier`
/// 1.0) with unlimited attempts; bounded exponential backoff is a
/// configuration choice, not a code change.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Whether reconnection is enabled.
    pub enabled: bool,
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Ceiling for the delay when backing off.
    pub max_delay: Duration,
    /// Multiplier applied after each failure; 1.0 keeps the delay fixed.
    pub backoff_multiplier: f64,
    /// Maximum number of reconnect attempts (0 = unlimited).
    pub max_attempts: usize,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.0,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Fixed-delay policy with unlimited attempts.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            ..Default::default()
        }
    }

    /// Exponential backoff between `initial_delay` and `max_delay`.
    #[must_use]
    pub fn backoff(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            backoff_multiplier: multiplier,
            ..Default::default()
        }
    }
}

/// Tracks reconnection attempts and computes the next delay.
#[derive(Debug)]
pub struct ReconnectState {
    config: ReconnectConfig,
    attempts: usize,
    current_delay: Duration,
}

impl ReconnectState {
    /// Creates a new reconnect state with the given configuration.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            attempts: 0,
            current_delay: initial_delay,
        }
    }

    /// Records a failed connection attempt and returns the delay before
    /// the next one.
    ///
    /// Returns `None` when reconnection is disabled or attempts are
    /// exhausted.
    pub fn on_failure(&mut self) -> Option<Duration> {
        if !self.config.enabled {
            return None;
        }

        self.attempts += 1;

        if self.config.max_attempts > 0 && self.attempts >= self.config.max_attempts {
            return None;
        }

        let delay = self.current_delay;

        let next_delay = Duration::from_secs_f64(
            self.current_delay.as_secs_f64() * self.config.backoff_multiplier,
        );
        self.current_delay = next_delay.min(self.config.max_delay);

        Some(delay)
    }

    /// Resets the attempt counter after a successful connection.
    pub fn on_success(&mut self) {
        self.attempts = 0;
        self.current_delay = self.config.initial_delay;
    }

    /// Returns the number of reconnection attempts made.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns true if more reconnection attempts are allowed.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.config.enabled
            && (self.config.max_attempts == 0 || self.attempts < self.config.max_attempts)
    }
}
