//! Error types for client operations.

use std::fmt;
use thiserror::Error;

/// The connection-lifecycle step where a transport failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    /// DNS resolution of the feed endpoint.
    Resolve,
    /// TCP socket connect.
    Connect,
    /// TLS handshake.
    TlsHandshake,
    /// WebSocket protocol upgrade.
    ProtocolHandshake,
    /// Subscription write after handshake.
    Subscribe,
    /// Streaming read.
    Read,
    /// Streaming write.
    Write,
}

impl fmt::Display for ConnectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectStep::Resolve => "dns resolution",
            ConnectStep::Connect => "tcp connect",
            ConnectStep::TlsHandshake => "tls handshake",
            ConnectStep::ProtocolHandshake => "protocol handshake",
            ConnectStep::Subscribe => "subscribe",
            ConnectStep::Read => "read",
            ConnectStep::Write => "write",
        };
        f.write_str(name)
    }
}

/// Error type for client operations.
///
/// Transport failures are recoverable: the session turns them into a
/// reconnect unless a stop is pending. Only `CallbackMissing` is fatal,
/// surfaced once at startup and never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure at a specific lifecycle step.
    #[error("transport failure during {step}: {source}")]
    Transport {
        /// The step that failed.
        step: ConnectStep,
        /// The underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Connection timeout while establishing the socket.
    #[error("connection timeout")]
    ConnectTimeout,

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,

    /// Maximum reconnect attempts reached.
    #[error("maximum reconnect attempts reached")]
    MaxReconnectAttempts,

    /// No event callback registered before streaming was requested.
    #[error("no event callback registered before streaming")]
    CallbackMissing,

    /// Session task failed to join (panicked or was aborted).
    #[error("session task failed: {0}")]
    Join(String),

    /// Instrument discovery request failed.
    #[error("instrument discovery failed: {message}")]
    Discovery {
        /// What went wrong.
        message: String,
    },
}

impl ClientError {
    /// Creates a transport error tagged with the failing step.
    pub fn transport(
        step: ConnectStep,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            step,
            source: source.into(),
        }
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_carries_step() {
        let err = ClientError::transport(ConnectStep::TlsHandshake, "certificate rejected");
        assert_eq!(
            err.to_string(),
            "transport failure during tls handshake: certificate rejected"
        );
    }

    #[test]
    fn test_connect_step_display() {
        assert_eq!(ConnectStep::Resolve.to_string(), "dns resolution");
        assert_eq!(ConnectStep::ProtocolHandshake.to_string(), "protocol handshake");
    }
}
