//! Client session management.

use crate::config::FeedConfig;
use crate::connector::FeedConnector;
use crate::error::{ClientError, ConnectStep};
use crate::reconnect::ReconnectState;
use crate::state::{SessionFsm, SessionState};
use crate::subscriptions::SubscriptionSet;
use feedforge_codec::{MessageDecoder, SubscribeRequest};
use feedforge_core::{EventCallback, FeedMessage, MarketEvent, TradeUpdate, Venue, now_millis};
use feedforge_marketdata::BookRegistry;
use futures::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Commands accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Send a subscribe for this instrument on the live connection.
    Subscribe(String),
}

enum LoopAction {
    Stop,
    Command(Option<SessionCommand>),
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

/// Drives one logical connection's lifecycle.
///
/// A session owns the supervision loop for its venue: connect ladder,
/// streaming, reconnection with a cancellable delay, and bounded-time
/// clean close on stop. Within the session, frames are processed strictly
/// in arrival order and every book update decoded from a frame is applied
/// before any trade from that frame is emitted. The event callback runs
/// synchronously on this task, outside the book's critical section.
pub struct ConnectionSession<C: FeedConnector> {
    venue: Venue,
    config: FeedConfig,
    connector: Arc<C>,
    subscriptions: SubscriptionSet,
    registry: Arc<BookRegistry>,
    callback: EventCallback,
    reconnect: ReconnectState,
    fsm: SessionFsm,
    state_tx: watch::Sender<SessionState>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    shutdown: CancellationToken,
}

impl<C: FeedConnector> ConnectionSession<C> {
    /// Creates a session and a receiver observing its state transitions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        venue: Venue,
        config: FeedConfig,
        connector: Arc<C>,
        subscriptions: SubscriptionSet,
        registry: Arc<BookRegistry>,
        callback: EventCallback,
        cmd_rx: mpsc::Receiver<SessionCommand>,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<SessionState>) {
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let reconnect = ReconnectState::new(config.reconnect.clone());
        let session = Self {
            venue,
            config,
            connector,
            subscriptions,
            registry,
            callback,
            reconnect,
            fsm: SessionFsm::new(),
            state_tx,
            cmd_rx,
            shutdown,
        };
        (session, state_rx)
    }

    /// Spawns the session on the current runtime and returns its handle.
    pub fn spawn(
        venue: Venue,
        config: FeedConfig,
        connector: Arc<C>,
        subscriptions: SubscriptionSet,
        registry: Arc<BookRegistry>,
        callback: EventCallback,
    ) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_capacity.max(1));
        let shutdown = CancellationToken::new();
        let (session, state_rx) = Self::new(
            venue,
            config,
            connector,
            subscriptions,
            registry,
            callback,
            cmd_rx,
            shutdown.clone(),
        );
        let task = tokio::spawn(session.run());
        SessionHandle {
            cmd_tx,
            shutdown,
            state_rx,
            task,
        }
    }

    /// Runs the session until an explicit stop or attempt exhaustion.
    ///
    /// Transport failures never escape here as panics; each one moves the
    /// machine through `Failed` into a cancellable reconnect delay. The
    /// returned error is reserved for attempt exhaustion; a stop request
    /// ends the session with `Ok(())`.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let result = loop {
            if self.shutdown.is_cancelled() {
                let state = self.fsm.on_stop();
                self.note(state);
                break Ok(());
            }

            match self.connect_and_stream().await {
                Ok(()) => break Ok(()),
                Err(e) => {
                    let state = self.fsm.on_failure();
                    self.note(state);
                    error!(venue = %self.venue, error = %e, "session transport failure");

                    if self.shutdown.is_cancelled() {
                        let state = self.fsm.on_stop();
                        self.note(state);
                        break Ok(());
                    }

                    let Some(delay) = self.reconnect.on_failure() else {
                        break Err(ClientError::MaxReconnectAttempts);
                    };
                    let state = self.fsm.on_retry_scheduled();
                    self.note(state);
                    if state != SessionState::ReconnectWait {
                        break Ok(());
                    }
                    info!(venue = %self.venue, ?delay, "reconnect scheduled");
                    tokio::select! {
                        () = self.shutdown.cancelled() => {
                            let state = self.fsm.on_stop();
                            self.note(state);
                            break Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        let state = self.fsm.on_closed();
        self.note(state);
        result
    }

    async fn connect_and_stream(&mut self) -> Result<(), ClientError> {
        let state = self.fsm.on_attempt();
        self.note(state);

        let connector = Arc::clone(&self.connector);
        let ws = {
            let fsm = &mut self.fsm;
            let state_tx = &self.state_tx;
            let venue = self.venue;
            let mut on_step = move |phase: SessionState| {
                let state = fsm.on_phase(phase);
                debug!(%venue, state = ?state, "session state");
                let _ = state_tx.send(state);
            };
            connector.connect(&self.config, &mut on_step).await?
        };

        self.reconnect.on_success();
        info!(venue = %self.venue, url = %self.config.url(), "connected");

        let (mut write, mut read) = ws.split();

        // The server forgets subscription state across a drop: flush the
        // durable set before anything else on every (re)connect.
        let state = self.fsm.on_phase(SessionState::Subscribing);
        self.note(state);
        let mut active: HashSet<String> = HashSet::new();
        let pending = self.subscriptions.snapshot();
        if !pending.is_empty() {
            let wire = SubscribeRequest::market(pending.clone()).to_wire();
            write
                .send(Message::Text(wire))
                .await
                .map_err(|e| ClientError::transport(ConnectStep::Subscribe, e))?;
            info!(venue = %self.venue, count = pending.len(), "subscriptions flushed");
            active.extend(pending);
        }

        let state = self.fsm.on_phase(SessionState::Streaming);
        self.note(state);

        let mut decoder = MessageDecoder::new();
        let shutdown = self.shutdown.clone();

        let result = loop {
            let action = tokio::select! {
                () = shutdown.cancelled() => LoopAction::Stop,
                cmd = self.cmd_rx.recv() => LoopAction::Command(cmd),
                frame = read.next() => LoopAction::Frame(frame),
            };

            match action {
                LoopAction::Stop => {
                    let state = self.fsm.on_stop();
                    self.note(state);
                    let close = async {
                        let _ = write.send(Message::Close(None)).await;
                        while let Some(frame) = read.next().await {
                            match frame {
                                Ok(Message::Close(_)) | Err(_) => break,
                                _ => {}
                            }
                        }
                    };
                    if tokio::time::timeout(self.config.close_grace, close)
                        .await
                        .is_err()
                    {
                        debug!(venue = %self.venue, "close grace elapsed, dropping connection");
                    }
                    break Ok(());
                }
                LoopAction::Command(Some(SessionCommand::Subscribe(id))) => {
                    self.subscriptions.add(id.clone());
                    if active.insert(id.clone()) {
                        let wire = SubscribeRequest::market([id.as_str()]).to_wire();
                        if let Err(e) = write.send(Message::Text(wire)).await {
                            break Err(ClientError::transport(ConnectStep::Write, e));
                        }
                        info!(venue = %self.venue, instrument = %id, "subscribed");
                    }
                }
                LoopAction::Command(None) => {
                    info!(venue = %self.venue, "command channel closed, stopping session");
                    shutdown.cancel();
                }
                LoopAction::Frame(Some(Ok(Message::Text(text)))) => {
                    self.process_frame(&mut decoder, &text);
                }
                LoopAction::Frame(Some(Ok(Message::Ping(payload)))) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        break Err(ClientError::transport(ConnectStep::Write, e));
                    }
                }
                LoopAction::Frame(Some(Ok(Message::Close(frame)))) => {
                    info!(venue = %self.venue, ?frame, "server closed connection");
                    break Err(ClientError::ConnectionClosed);
                }
                LoopAction::Frame(Some(Ok(_))) => {
                    // Binary, pong, and raw frames carry nothing on this feed.
                }
                LoopAction::Frame(Some(Err(e))) => {
                    break Err(ClientError::transport(ConnectStep::Read, e));
                }
                LoopAction::Frame(None) => break Err(ClientError::ConnectionClosed),
            }
        };

        let stats = decoder.stats();
        info!(
            venue = %self.venue,
            frames = stats.frames,
            events = stats.events,
            skipped = stats.skipped_events,
            frame_errors = stats.frame_errors,
            "connection ended"
        );
        result
    }

    /// Decodes one frame and applies every resulting event in order.
    ///
    /// Decode failures are scoped: a malformed frame is logged and dropped,
    /// the stream continues.
    fn process_frame(&self, decoder: &mut MessageDecoder, raw: &str) {
        let messages = match decoder.decode(raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(venue = %self.venue, error = %e, "dropping malformed frame");
                return;
            }
        };

        for message in messages {
            match message {
                FeedMessage::Snapshot(snapshot) => {
                    self.registry
                        .book(&snapshot.instrument_id)
                        .apply_snapshot(&snapshot);
                }
                FeedMessage::LevelChange(update) => {
                    self.registry
                        .book(&update.instrument_id)
                        .apply_update(&update);
                }
                FeedMessage::Trade(trade) => self.emit_trade(trade),
            }
        }
    }

    fn emit_trade(&self, trade: TradeUpdate) {
        // Top-of-book is read after every prior update from the same frame
        // has been applied; the callback runs outside the book lock.
        let top = self.registry.book(&trade.instrument_id).top_of_book();
        let event = MarketEvent {
            venue: self.venue,
            instrument_id: trade.instrument_id,
            timestamp_exchange: trade.timestamp_exchange,
            timestamp_received: now_millis(),
            price: trade.price,
            size: trade.size,
            side: trade.side,
            best_bid: top.bid,
            best_ask: top.ask,
            raw_payload: trade.raw_payload,
        };
        (self.callback)(event);
    }

    fn note(&self, state: SessionState) {
        debug!(venue = %self.venue, state = ?state, "session state");
        let _ = self.state_tx.send(state);
    }
}

/// Handle to a spawned session.
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    shutdown: CancellationToken,
    state_rx: watch::Receiver<SessionState>,
    task: JoinHandle<Result<(), ClientError>>,
}

impl SessionHandle {
    /// Returns the most recently published session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver observing state transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Returns true once the session task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the live connection to send a subscribe for this instrument.
    ///
    /// Best-effort: if the hint is dropped (channel full, between
    /// connections), the durable set still covers the instrument at the
    /// next handshake flush.
    pub fn subscribe(&self, instrument_id: impl Into<String>) {
        let _ = self
            .cmd_tx
            .try_send(SessionCommand::Subscribe(instrument_id.into()));
    }

    /// Requests a stop without waiting. Cancels any pending reconnect.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the session to finish.
    ///
    /// # Errors
    /// Returns the session's terminal error, or [`ClientError::Join`] when
    /// the task panicked or was aborted.
    pub async fn join(self) -> Result<(), ClientError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Join(e.to_string())),
        }
    }

    /// Cancels the session and waits for shutdown, bounded by `grace`.
    ///
    /// Best-effort: an overrunning task is left to finish in the
    /// background.
    pub async fn stop(self, grace: Duration) {
        self.shutdown.cancel();
        match tokio::time::timeout(grace, self.task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "session ended with error during stop"),
            Ok(Err(e)) => warn!(error = %e, "session task join failed"),
            Err(_) => warn!("session did not stop within grace period"),
        }
    }
}
