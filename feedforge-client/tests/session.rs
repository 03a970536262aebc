//! Session lifecycle tests over an in-memory duplex transport.

use async_trait::async_trait;
use feedforge_client::config::FeedConfig;
use feedforge_client::connector::FeedConnector;
use feedforge_client::error::{ClientError, ConnectStep};
use feedforge_client::reconnect::ReconnectConfig;
use feedforge_client::session::ConnectionSession;
use feedforge_client::state::SessionState;
use feedforge_client::subscriptions::SubscriptionSet;
use feedforge_core::{EventCallback, MarketEvent, Side, Venue};
use feedforge_marketdata::BookRegistry;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Connector that hands the server half of a fresh duplex pipe to the test
/// on every attempt.
struct DuplexConnector {
    server_tx: mpsc::UnboundedSender<DuplexStream>,
    attempts: AtomicUsize,
}

impl DuplexConnector {
    fn new(server_tx: mpsc::UnboundedSender<DuplexStream>) -> Self {
        Self {
            server_tx,
            attempts: AtomicUsize::new(0),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedConnector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(
        &self,
        _config: &FeedConfig,
        on_step: &mut (dyn FnMut(SessionState) + Send),
    ) -> Result<WebSocketStream<Self::Stream>, ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        on_step(SessionState::Resolving);
        on_step(SessionState::Connecting);

        let (client_end, server_end) = tokio::io::duplex(256 * 1024);
        self.server_tx
            .send(server_end)
            .map_err(|_| ClientError::transport(ConnectStep::Connect, "test server gone"))?;

        on_step(SessionState::ProtocolHandshaking);
        let (ws, _response) = tokio_tungstenite::client_async("ws://feed.test/ws", client_end)
            .await
            .map_err(|e| ClientError::transport(ConnectStep::ProtocolHandshake, e))?;
        Ok(ws)
    }
}

/// Connector that fails every attempt at the connect step.
struct FailingConnector {
    attempts: AtomicUsize,
}

impl FailingConnector {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedConnector for FailingConnector {
    type Stream = DuplexStream;

    async fn connect(
        &self,
        _config: &FeedConfig,
        on_step: &mut (dyn FnMut(SessionState) + Send),
    ) -> Result<WebSocketStream<Self::Stream>, ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        on_step(SessionState::Resolving);
        Err(ClientError::transport(
            ConnectStep::Connect,
            "connection refused",
        ))
    }
}

fn test_config(reconnect_delay: Duration) -> FeedConfig {
    FeedConfig::new("feed.test", 443, "/ws")
        .close_grace(Duration::from_millis(200))
        .reconnect(ReconnectConfig::fixed(reconnect_delay))
}

fn collecting_callback() -> (EventCallback, mpsc::UnboundedReceiver<MarketEvent>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event| {
        let _ = event_tx.send(event);
    });
    (callback, event_rx)
}

async fn expect_text<S>(ws: &mut WebSocketStream<S>) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("read timed out")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return text;
        }
    }
}

#[tokio::test]
async fn resubscribes_and_emits_trades_after_reconnect() {
    let (server_tx, mut server_rx) = mpsc::unbounded_channel();
    let connector = Arc::new(DuplexConnector::new(server_tx));
    let subscriptions = SubscriptionSet::new();
    subscriptions.add("tok-1");
    let registry = Arc::new(BookRegistry::new());
    let (callback, mut event_rx) = collecting_callback();

    let handle = ConnectionSession::spawn(
        Venue::Polymarket,
        test_config(Duration::from_millis(20)),
        Arc::clone(&connector),
        subscriptions.clone(),
        Arc::clone(&registry),
        callback,
    );
    let state_rx = handle.state_receiver();

    // First connection: the durable set is flushed right after handshake.
    let stream = server_rx.recv().await.expect("first connection");
    let mut ws = accept_async(stream).await.expect("server handshake");
    let flushed = expect_text(&mut ws).await;
    assert!(flushed.contains("market"));
    assert!(flushed.contains("tok-1"));

    // Drop the connection mid-stream to force a reconnect.
    drop(ws);

    // Second connection: subscriptions must be re-sent, the server forgot
    // them.
    let stream = server_rx.recv().await.expect("reconnect");
    let mut ws = accept_async(stream).await.expect("second handshake");
    let resent = expect_text(&mut ws).await;
    assert!(resent.contains("tok-1"));
    assert!(connector.attempts() >= 2);

    // Snapshot then trade in separate frames: the emitted event embeds the
    // top of book as of every prior update.
    ws.send(Message::Text(
        r#"{"event_type":"book","asset_id":"tok-1","bids":[{"price":"0.40","size":"10"}],"asks":[{"price":"0.45","size":"5"}],"timestamp":"1"}"#.into(),
    ))
    .await
    .expect("send snapshot");
    ws.send(Message::Text(
        r#"{"event_type":"last_trade_price","asset_id":"tok-1","price":"0.43","size":"7","side":"BUY","timestamp":"1700000000000"}"#.into(),
    ))
    .await
    .expect("send trade");

    let event = timeout(Duration::from_secs(5), event_rx.recv())
        .await
        .expect("event timed out")
        .expect("callback dropped");
    assert_eq!(event.instrument_id, "tok-1");
    assert_eq!(event.price, 0.43);
    assert_eq!(event.size, 7.0);
    assert_eq!(event.side, Side::Bid);
    assert_eq!(event.timestamp_exchange, 1_700_000_000_000);
    assert!(event.timestamp_received > 0);
    assert_eq!(event.best_bid.expect("best bid").price, 0.40);
    assert_eq!(event.best_ask.expect("best ask").price, 0.45);

    handle.cancel();
    timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("join timed out")
        .expect("session errored");
    assert_eq!(*state_rx.borrow(), SessionState::Closed);

    // Book state survives the session.
    let top = registry.book("tok-1").top_of_book();
    assert_eq!(top.bid.expect("bid").price, 0.40);
}

#[tokio::test]
async fn subscribe_while_streaming_sends_immediately_and_is_durable() {
    let (server_tx, mut server_rx) = mpsc::unbounded_channel();
    let connector = Arc::new(DuplexConnector::new(server_tx));
    let subscriptions = SubscriptionSet::new();
    let registry = Arc::new(BookRegistry::new());
    let (callback, _event_rx) = collecting_callback();

    let handle = ConnectionSession::spawn(
        Venue::Polymarket,
        test_config(Duration::from_millis(20)),
        connector,
        subscriptions.clone(),
        registry,
        callback,
    );

    let stream = server_rx.recv().await.expect("connection");
    let mut ws = accept_async(stream).await.expect("server handshake");

    // Empty durable set: nothing is flushed, the first message is the
    // immediate subscribe.
    handle.subscribe("tok-7");
    let sent = expect_text(&mut ws).await;
    assert!(sent.contains("tok-7"));
    assert!(subscriptions.contains("tok-7"));

    handle.cancel();
    timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("join timed out")
        .expect("session errored");
}

#[tokio::test]
async fn transport_failure_walks_failed_reconnect_resolving() {
    let connector = Arc::new(FailingConnector::new());
    let (callback, _event_rx) = collecting_callback();

    let handle = ConnectionSession::spawn(
        Venue::Polymarket,
        test_config(Duration::from_millis(10)),
        Arc::clone(&connector),
        SubscriptionSet::new(),
        Arc::new(BookRegistry::new()),
        callback,
    );

    // A second attempt proves ReconnectWait re-entered Resolving after the
    // timer fired.
    timeout(Duration::from_secs(5), async {
        while connector.attempts() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("never reattempted");

    handle.cancel();
    timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("join timed out")
        .expect("session errored");
}

#[tokio::test]
async fn stop_during_reconnect_wait_cancels_timer_and_closes() {
    let connector = Arc::new(FailingConnector::new());
    let (callback, _event_rx) = collecting_callback();

    // Long delay: the session parks in ReconnectWait until stopped.
    let handle = ConnectionSession::spawn(
        Venue::Polymarket,
        test_config(Duration::from_secs(30)),
        Arc::clone(&connector),
        SubscriptionSet::new(),
        Arc::new(BookRegistry::new()),
        callback,
    );

    let mut state_rx = handle.state_receiver();
    timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|s| *s == SessionState::ReconnectWait),
    )
    .await
    .expect("never reached ReconnectWait")
    .expect("state channel closed");

    handle.cancel();
    timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("join timed out")
        .expect("session errored");

    // Terminal state, and the timer never produced another attempt.
    assert_eq!(*state_rx.borrow(), SessionState::Closed);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn attempt_exhaustion_surfaces_error() {
    let connector = Arc::new(FailingConnector::new());
    let (callback, _event_rx) = collecting_callback();

    let config = test_config(Duration::from_millis(5)).reconnect(ReconnectConfig {
        initial_delay: Duration::from_millis(5),
        max_attempts: 2,
        ..Default::default()
    });
    let handle = ConnectionSession::spawn(
        Venue::Polymarket,
        config,
        connector,
        SubscriptionSet::new(),
        Arc::new(BookRegistry::new()),
        callback,
    );
    let state_rx = handle.state_receiver();

    let err = timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("join timed out")
        .expect_err("session should exhaust attempts");
    assert!(matches!(err, ClientError::MaxReconnectAttempts));
    assert_eq!(*state_rx.borrow(), SessionState::Closed);
}
