//! WebSocket connection from the target to the relay.
//!
//! [`RelayClient::start`] runs a reconnect loop in the background:
//!
//! 1. connect to the relay URL;
//! 2. send `register` with the target token;
//! 3. forward routed commands and injection text as [`RelayEvent`]s;
//! 4. on transport loss wait `reconnect_interval` and start over.
//!
//! A `registration_fail` or an `evicted` message ends the loop for good, so a
//! rejected or displaced target does not keep fighting for the slot.
//!
//! Frames go out through the [`FrameSink`] implementation, which refuses
//! them until the relay has confirmed the registration.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use relay_core::{decode_relay_msg, encode, ClientMsg, ControlCommand, RelayMsg};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::application::capture::{FrameSink, SinkError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Errors from the relay connection.
#[derive(Debug, Error)]
pub enum RelayClientError {
    /// No registered connection is open.
    #[error("not connected to the relay")]
    NotConnected,

    /// The WebSocket failed.
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] relay_core::ProtocolError),
}

impl From<RelayClientError> for SinkError {
    fn from(e: RelayClientError) -> Self {
        match e {
            RelayClientError::NotConnected => SinkError::NotConnected,
            other => SinkError::Delivery(other.to_string()),
        }
    }
}

/// Configuration for [`RelayClient`].
#[derive(Debug, Clone)]
pub struct RelayClientConfig {
    /// `ws://` or `wss://` URL of the relay.
    pub url: String,
    /// Token presented in `register`.
    pub token: String,
    /// Delay before reconnecting after the connection drops.
    pub reconnect_interval: Duration,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000".to_string(),
            token: String::new(),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

/// Events the connection delivers to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// The relay confirmed the registration; frames now flow.
    Registered,
    /// A viewer command routed to this target.
    Command(ControlCommand),
    /// New text for the typing engine.
    InjectionText(String),
    /// The connection was lost; a reconnect follows unless the loop ended.
    Disconnected,
}

/// Why the reconnect loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientExit {
    /// [`RelayClient::shutdown`] was called.
    Shutdown,
    /// The relay rejected the token.
    Rejected(String),
    /// Another target took the slot.
    Evicted(String),
}

/// How one connection ended.
enum SessionEnd {
    Lost,
    Final(ClientExit),
}

/// Manages the target's WebSocket connection to the relay.
pub struct RelayClient {
    config: RelayClientConfig,
    writer: Arc<Mutex<Option<WsWriter>>>,
    registered: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl RelayClient {
    /// Creates a new (not yet connected) client.
    pub fn new(config: RelayClientConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            writer: Arc::new(Mutex::new(None)),
            registered: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Whether the relay has confirmed the current registration.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Relaxed)
    }

    /// Starts the reconnect loop.
    ///
    /// Returns the event receiver and the loop's handle, which resolves to
    /// the reason the loop ended. The event channel closes when it ends.
    pub fn start(self: Arc<Self>) -> (mpsc::Receiver<RelayEvent>, JoinHandle<ClientExit>) {
        let (tx, rx) = mpsc::channel(256);
        let handle = tokio::spawn(async move { self.run(tx).await });
        (rx, handle)
    }

    /// Ends the reconnect loop and closes the socket.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Sends one screen frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayClientError::NotConnected`] before registration and
    /// [`RelayClientError::Transport`] if the socket fails.
    pub async fn send_frame(&self, frame: Vec<u8>) -> Result<(), RelayClientError> {
        if !self.is_registered() {
            return Err(RelayClientError::NotConnected);
        }
        self.send(WsMessage::Binary(frame)).await
    }

    async fn send(&self, msg: WsMessage) -> Result<(), RelayClientError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(RelayClientError::NotConnected)?;
        writer.send(msg).await?;
        Ok(())
    }

    async fn run(&self, tx: mpsc::Sender<RelayEvent>) -> ClientExit {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow() {
                return ClientExit::Shutdown;
            }

            match connect_async(self.config.url.as_str()).await {
                Ok((ws, _)) => {
                    info!("connected to relay at {}", self.config.url);
                    let end = self.run_session(ws, &tx, &mut shutdown).await;

                    self.registered.store(false, Ordering::Relaxed);
                    if let Some(mut writer) = self.writer.lock().await.take() {
                        let _ = writer.close().await;
                    }
                    let _ = tx.send(RelayEvent::Disconnected).await;

                    match end {
                        SessionEnd::Final(exit) => return exit,
                        SessionEnd::Lost => info!(
                            "disconnected from relay; reconnecting in {:?}",
                            self.config.reconnect_interval
                        ),
                    }
                }
                Err(e) => warn!("could not connect to relay at {}: {e}", self.config.url),
            }

            tokio::select! {
                _ = time::sleep(self.config.reconnect_interval) => {}
                _ = shutdown.wait_for(|stop| *stop) => return ClientExit::Shutdown,
            }
        }
    }

    async fn run_session(
        &self,
        ws: WsStream,
        tx: &mpsc::Sender<RelayEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (writer, mut reader) = ws.split();
        *self.writer.lock().await = Some(writer);

        let register = match encode(&ClientMsg::Register {
            token: self.config.token.clone(),
        }) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode register message: {e}");
                return SessionEnd::Lost;
            }
        };
        if let Err(e) = self.send(WsMessage::Text(register)).await {
            warn!("failed to send register: {e}");
            return SessionEnd::Lost;
        }

        tokio::select! {
            end = self.read_loop(&mut reader, tx) => end,
            _ = shutdown.wait_for(|stop| *stop) => {
                info!("closing relay connection");
                SessionEnd::Final(ClientExit::Shutdown)
            }
        }
    }

    async fn read_loop(&self, reader: &mut WsReader, tx: &mpsc::Sender<RelayEvent>) -> SessionEnd {
        while let Some(next) = reader.next().await {
            let text = match next {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(frame)) => {
                    debug!("relay closed the connection: {frame:?}");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("relay connection error: {e}");
                    break;
                }
            };

            let msg = match decode_relay_msg(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("ignoring malformed relay message: {e}");
                    continue;
                }
            };
            debug!("received {}", msg.kind());

            let event = match msg {
                RelayMsg::RegistrationSuccess => {
                    info!("registered with relay");
                    self.registered.store(true, Ordering::Relaxed);
                    RelayEvent::Registered
                }
                RelayMsg::RegistrationFail { message } => {
                    error!("relay rejected registration: {message}");
                    return SessionEnd::Final(ClientExit::Rejected(message));
                }
                RelayMsg::Evicted { message } => {
                    warn!("evicted by relay: {message}");
                    return SessionEnd::Final(ClientExit::Evicted(message));
                }
                RelayMsg::Command { command } => RelayEvent::Command(command),
                RelayMsg::ReceiveInjectionText { text } => RelayEvent::InjectionText(text),
                other => {
                    debug!("ignoring {} on target connection", other.kind());
                    continue;
                }
            };

            if tx.send(event).await.is_err() {
                return SessionEnd::Final(ClientExit::Shutdown);
            }
        }
        SessionEnd::Lost
    }
}

#[async_trait]
impl FrameSink for RelayClient {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), SinkError> {
        Ok(RelayClient::send_frame(self, frame).await?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reconnect_interval_is_five_seconds() {
        let cfg = RelayClientConfig::default();
        assert_eq!(cfg.reconnect_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_frames_are_refused_before_registration() {
        // Arrange
        let client = RelayClient::new(RelayClientConfig::default());

        // Act
        let result = client.send_frame(vec![1, 2, 3]).await;

        // Assert
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, RelayClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_sink_reports_not_connected_as_typed_error() {
        let client = RelayClient::new(RelayClientConfig::default());
        let sink: &dyn FrameSink = &client;
        let err = tokio_test::assert_err!(sink.send_frame(vec![1]).await);
        assert!(matches!(err, SinkError::NotConnected));
    }

    #[tokio::test]
    async fn test_shutdown_ends_reconnect_loop() {
        // Arrange: nothing listens on port 9 of localhost
        let client = Arc::new(RelayClient::new(RelayClientConfig {
            url: "ws://127.0.0.1:9".into(),
            token: "t".into(),
            reconnect_interval: Duration::from_secs(60),
        }));
        let (_events, handle) = Arc::clone(&client).start();

        // Act
        time::sleep(Duration::from_millis(100)).await;
        client.shutdown();

        // Assert
        let exit = time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, ClientExit::Shutdown);
    }
}
