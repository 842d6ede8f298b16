//! A viewer's WebSocket session with the relay.
//!
//! ```text
//! connect()  →  authenticate(secret)  →  loop { next_event() / send_command() }
//! ```
//!
//! Status messages that arrive while [`ViewerSession::authenticate`] waits
//! for its reply are kept and returned by the next calls to
//! [`ViewerSession::next_event`], so nothing is lost.
//!
//! [`ViewerSession::next_event`] is cancel-safe and can sit in a
//! `tokio::select!` next to a console reader.

use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use relay_core::{decode_relay_msg, encode, ClientMsg, ControlCommand, RelayMsg};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors from a viewer session.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The WebSocket failed.
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] relay_core::ProtocolError),

    /// The relay rejected the viewer secret.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The relay closed the connection.
    #[error("connection closed by relay")]
    Closed,
}

/// Something the relay sent to this viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A JSON control message (status, ack, error).
    Status(RelayMsg),
    /// One JPEG screen frame from the current target.
    Frame(Vec<u8>),
}

/// An open connection to the relay in the viewer role.
pub struct ViewerSession {
    ws: WsStream,
    pending: VecDeque<ViewerEvent>,
    authenticated: bool,
}

impl ViewerSession {
    /// Opens the WebSocket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Transport`] if the connection or handshake fails.
    pub async fn connect(url: &str) -> Result<Self, ViewerError> {
        let (ws, _) = connect_async(url).await?;
        info!("connected to relay at {url}");
        Ok(Self {
            ws,
            pending: VecDeque::new(),
            authenticated: false,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Sends `authenticate` and waits for the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::AuthFailed`] with the relay's message when the
    /// secret is rejected, or [`ViewerError::Closed`] if the relay hangs up
    /// first.
    pub async fn authenticate(&mut self, secret: &str) -> Result<(), ViewerError> {
        self.send(&ClientMsg::Authenticate {
            secret: secret.to_string(),
        })
        .await?;

        loop {
            match self.read_event().await? {
                Some(ViewerEvent::Status(RelayMsg::Authenticated)) => {
                    info!("authenticated with relay");
                    self.authenticated = true;
                    return Ok(());
                }
                Some(ViewerEvent::Status(RelayMsg::AuthFailed { message })) => {
                    return Err(ViewerError::AuthFailed(message));
                }
                Some(other) => self.pending.push_back(other),
                None => return Err(ViewerError::Closed),
            }
        }
    }

    /// Sends one pointer or keyboard command for the current target.
    pub async fn send_command(&mut self, command: ControlCommand) -> Result<(), ViewerError> {
        self.send(&ClientMsg::Command { command }).await
    }

    /// Stages `text` in the target's typing engine.
    pub async fn set_injection_text(&mut self, text: impl Into<String>) -> Result<(), ViewerError> {
        self.send(&ClientMsg::SetInjectionText { text: text.into() }).await
    }

    /// Sends any client message.
    pub async fn send(&mut self, msg: &ClientMsg) -> Result<(), ViewerError> {
        let text = encode(msg)?;
        self.ws.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    /// Waits for the next frame or status message. `Ok(None)` means the relay
    /// closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ViewerEvent>, ViewerError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        self.read_event().await
    }

    /// Closes the connection.
    pub async fn close(mut self) -> Result<(), ViewerError> {
        match self.ws.close(None).await {
            Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_event(&mut self) -> Result<Option<ViewerEvent>, ViewerError> {
        while let Some(next) = self.ws.next().await {
            match next? {
                WsMessage::Binary(bytes) => return Ok(Some(ViewerEvent::Frame(bytes))),
                WsMessage::Text(text) => match decode_relay_msg(&text) {
                    Ok(msg) => {
                        debug!("received {}", msg.kind());
                        return Ok(Some(ViewerEvent::Status(msg)));
                    }
                    Err(e) => warn!("ignoring malformed relay message: {e}"),
                },
                WsMessage::Close(frame) => {
                    debug!("relay closed the connection: {frame:?}");
                    return Ok(None);
                }
                _ => {}
            }
        }
        Ok(None)
    }
}
