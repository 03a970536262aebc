//! Transport establishment.

use crate::config::FeedConfig;
use crate::error::{ClientError, ConnectStep};
use crate::state::SessionState;
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tracing::debug;

/// Establishes one secure streaming connection.
///
/// Implementations perform endpoint resolution, socket connect, secure
/// handshake, and protocol upgrade as distinct suspension points,
/// reporting each phase through `on_step` as it begins. The seam exists so
/// the session state machine and the decode/book path are testable without
/// a live socket.
#[async_trait]
pub trait FeedConnector: Send + Sync + 'static {
    /// The byte stream the WebSocket runs over.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connects and upgrades to a streaming WebSocket.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] tagged with the failing step, or
    /// [`ClientError::ConnectTimeout`] when every resolved address times
    /// out.
    async fn connect(
        &self,
        config: &FeedConfig,
        on_step: &mut (dyn FnMut(SessionState) + Send),
    ) -> Result<WebSocketStream<Self::Stream>, ClientError>;
}

/// Production connector: TCP, rustls TLS, WebSocket upgrade.
pub struct WssConnector {
    tls: TlsConnector,
}

impl WssConnector {
    /// Builds a connector trusting the platform's native root certificates.
    ///
    /// # Errors
    /// Returns a TLS-step transport error when the TLS configuration
    /// cannot be constructed.
    pub fn new() -> Result<Self, ClientError> {
        let mut root_store = rustls::RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            let _ = root_store.add(cert);
        }

        let config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::transport(ConnectStep::TlsHandshake, e))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
        })
    }
}

#[async_trait]
impl FeedConnector for WssConnector {
    type Stream = tokio_rustls::client::TlsStream<TcpStream>;

    async fn connect(
        &self,
        config: &FeedConfig,
        on_step: &mut (dyn FnMut(SessionState) + Send),
    ) -> Result<WebSocketStream<Self::Stream>, ClientError> {
        on_step(SessionState::Resolving);
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((config.host.as_str(), config.port))
            .await
            .map_err(|e| ClientError::transport(ConnectStep::Resolve, e))?
            .collect();
        if addrs.is_empty() {
            return Err(ClientError::transport(
                ConnectStep::Resolve,
                "endpoint resolved to no addresses",
            ));
        }

        // IPv4 first: v6 routes to this feed tend to time out.
        let mut ordered: Vec<SocketAddr> = addrs.iter().filter(|a| a.is_ipv4()).copied().collect();
        ordered.extend(addrs.iter().filter(|a| a.is_ipv6()).copied());

        on_step(SessionState::Connecting);
        let mut tcp = None;
        let mut last_err: Option<std::io::Error> = None;
        for addr in &ordered {
            match tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!(%addr, "tcp connected");
                    tcp = Some(stream);
                    break;
                }
                Ok(Err(e)) => {
                    debug!(%addr, error = %e, "tcp connect failed");
                    last_err = Some(e);
                }
                Err(_) => {
                    debug!(%addr, "tcp connect timed out");
                }
            }
        }
        let tcp = match (tcp, last_err) {
            (Some(stream), _) => stream,
            (None, Some(e)) => return Err(ClientError::transport(ConnectStep::Connect, e)),
            (None, None) => return Err(ClientError::ConnectTimeout),
        };
        tcp.set_nodelay(true)
            .map_err(|e| ClientError::transport(ConnectStep::Connect, e))?;

        on_step(SessionState::TlsHandshaking);
        let server_name = ServerName::try_from(config.host.clone())
            .map_err(|e| ClientError::transport(ConnectStep::TlsHandshake, e))?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| ClientError::transport(ConnectStep::TlsHandshake, e))?;

        on_step(SessionState::ProtocolHandshaking);
        let mut request = config
            .url()
            .into_client_request()
            .map_err(|e| ClientError::transport(ConnectStep::ProtocolHandshake, e))?;
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ClientError::transport(ConnectStep::ProtocolHandshake, e))?;
        request.headers_mut().insert(USER_AGENT, user_agent);

        let (ws, response) = tokio_tungstenite::client_async(request, tls)
            .await
            .map_err(|e| ClientError::transport(ConnectStep::ProtocolHandshake, e))?;
        debug!(status = ?response.status(), "websocket upgrade complete");

        Ok(ws)
    }
}
