//! Connection lifecycle state machine.

/// States of one logical connection's lifecycle.
///
/// The happy path walks `Idle` through the connect ladder to `Streaming`.
/// Any transport failure lands in `Failed`, then `ReconnectWait` schedules
/// re-entry at `Resolving`; when a stop is pending instead, the
/// session moves through `Closing` to the terminal `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Resolving the endpoint host.
    Resolving,
    /// TCP connect in flight.
    Connecting,
    /// TLS handshake in flight.
    TlsHandshaking,
    /// WebSocket upgrade in flight.
    ProtocolHandshaking,
    /// Flushing durable subscriptions after handshake.
    Subscribing,
    /// Reading frames.
    Streaming,
    /// A transport step failed.
    Failed,
    /// Waiting out the reconnect delay.
    ReconnectWait,
    /// Explicit stop in progress, bounded-time clean close.
    Closing,
    /// Terminal. Accepts no further transitions.
    Closed,
}

impl SessionState {
    /// Returns true for the states of the connect ladder, `Resolving`
    /// through `Streaming`.
    #[must_use]
    pub fn is_connect_phase(&self) -> bool {
        matches!(
            self,
            SessionState::Resolving
                | SessionState::Connecting
                | SessionState::TlsHandshaking
                | SessionState::ProtocolHandshaking
                | SessionState::Subscribing
                | SessionState::Streaming
        )
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// Pure transition core of the session lifecycle.
///
/// Holds no transport state, so every transition rule is testable without
/// a socket; the async session driver feeds it events and publishes the
/// resulting states.
#[derive(Debug)]
pub struct SessionFsm {
    state: SessionState,
    stop_pending: bool,
}

impl SessionFsm {
    /// Creates the machine in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            stop_pending: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// Begins a connection attempt: entry to `Resolving`.
    ///
    /// Covers both the initial start and re-entry after the reconnect
    /// timer fires. Ignored once stopping.
    pub fn on_attempt(&mut self) -> SessionState {
        if !self.halted() {
            self.state = SessionState::Resolving;
        }
        self.state
    }

    /// Records entry into a connect-ladder phase.
    ///
    /// Non-ladder targets and events arriving while stopping are ignored,
    /// so a connector reporting progress can never resurrect a closing
    /// session.
    pub fn on_phase(&mut self, phase: SessionState) -> SessionState {
        if !self.halted() && phase.is_connect_phase() {
            self.state = phase;
        }
        self.state
    }

    /// A transport step failed.
    pub fn on_failure(&mut self) -> SessionState {
        if !self.halted() {
            self.state = SessionState::Failed;
        }
        self.state
    }

    /// A reconnect delay was scheduled: `Failed` to `ReconnectWait`, or
    /// straight to `Closing` when a stop is already pending.
    pub fn on_retry_scheduled(&mut self) -> SessionState {
        if self.state != SessionState::Closed {
            self.state = if self.stop_pending {
                SessionState::Closing
            } else {
                SessionState::ReconnectWait
            };
        }
        self.state
    }

    /// Explicit stop request. Suppresses any further reconnect.
    pub fn on_stop(&mut self) -> SessionState {
        self.stop_pending = true;
        if self.state != SessionState::Closed {
            self.state = SessionState::Closing;
        }
        self.state
    }

    /// Shutdown finished. Terminal.
    pub fn on_closed(&mut self) -> SessionState {
        self.state = SessionState::Closed;
        self.state
    }

    fn halted(&self) -> bool {
        matches!(self.state, SessionState::Closing | SessionState::Closed)
    }
}

impl Default for SessionFsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming_fsm() -> SessionFsm {
        let mut fsm = SessionFsm::new();
        fsm.on_attempt();
        for phase in [
            SessionState::Connecting,
            SessionState::TlsHandshaking,
            SessionState::ProtocolHandshaking,
            SessionState::Subscribing,
            SessionState::Streaming,
        ] {
            fsm.on_phase(phase);
        }
        fsm
    }

    #[test]
    fn test_connect_ladder_reaches_streaming() {
        let fsm = streaming_fsm();
        assert_eq!(fsm.state(), SessionState::Streaming);
    }

    #[test]
    fn test_streaming_failure_walks_reconnect_cycle() {
        let mut fsm = streaming_fsm();
        assert_eq!(fsm.on_failure(), SessionState::Failed);
        assert_eq!(fsm.on_retry_scheduled(), SessionState::ReconnectWait);
        assert_eq!(fsm.on_attempt(), SessionState::Resolving);
    }

    #[test]
    fn test_stop_during_reconnect_wait_never_resolves_again() {
        let mut fsm = streaming_fsm();
        fsm.on_failure();
        fsm.on_retry_scheduled();
        assert_eq!(fsm.state(), SessionState::ReconnectWait);

        assert_eq!(fsm.on_stop(), SessionState::Closing);
        // A late timer event must not re-enter the ladder.
        assert_eq!(fsm.on_attempt(), SessionState::Closing);
        assert_eq!(fsm.on_closed(), SessionState::Closed);
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut fsm = SessionFsm::new();
        fsm.on_stop();
        fsm.on_closed();
        assert_eq!(fsm.on_attempt(), SessionState::Closed);
        assert_eq!(fsm.on_failure(), SessionState::Closed);
        assert_eq!(fsm.on_retry_scheduled(), SessionState::Closed);
        assert_eq!(fsm.on_phase(SessionState::Streaming), SessionState::Closed);
        assert!(fsm.state().is_terminal());
    }

    #[test]
    fn test_failure_with_stop_pending_goes_to_closing() {
        let mut fsm = streaming_fsm();
        fsm.on_stop();
        // Stop raced with a transport failure: no reconnect is scheduled.
        fsm.on_retry_scheduled();
        assert_eq!(fsm.state(), SessionState::Closing);
    }

    #[test]
    fn test_phase_rejects_non_ladder_targets() {
        let mut fsm = SessionFsm::new();
        fsm.on_attempt();
        assert_eq!(fsm.on_phase(SessionState::Failed), SessionState::Resolving);
        assert_eq!(fsm.on_phase(SessionState::Closed), SessionState::Resolving);
    }

    #[test]
    fn test_connect_phase_predicate() {
        assert!(SessionState::Resolving.is_connect_phase());
        assert!(SessionState::Streaming.is_connect_phase());
        assert!(!SessionState::Failed.is_connect_phase());
        assert!(!SessionState::Idle.is_connect_phase());
    }
}
