//! WebSocket server: accept loop and per-session task management.
//!
//! Each accepted connection gets:
//!
//! 1. A fresh [`ConnectionId`] and an outbox registered with the relay actor.
//! 2. A **writer** task that drains the outbox into the socket and pings the
//!    peer every `ping_interval`.
//! 3. A **reader** task that decodes text frames as control messages, hands
//!    binary frames to the relay as screen frames, and gives up on a peer
//!    that stays silent for longer than `idle_timeout`.
//!
//! The session ends when either task finishes; the relay is then told the
//! connection is gone.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use relay_core::{decode_client_msg, ConnectionId};

use crate::domain::RelayConfig;
use crate::infrastructure::outbox::{self, run_writer};
use crate::infrastructure::relay_actor::{spawn_relay, RelayHandle};

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {}", config.bind_addr))?;
    serve(listener, config, running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Tests bind `127.0.0.1:0` themselves and pass the listener in so they can
/// learn the port before the server starts.
pub async fn serve(
    listener: TcpListener,
    config: RelayConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("listener has no local address")?;
    info!(
        "relay listening on {local_addr} (max {} fps)",
        config.target_fps
    );

    let relay = spawn_relay(&config);
    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the running flag is re-checked while idle.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let relay = relay.clone();
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, cfg, relay).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<RelayConfig>,
    relay: RelayHandle,
) {
    match run_session(raw_stream, peer_addr, config, relay).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<RelayConfig>,
    relay: RelayHandle,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ConnectionId::new();
    info!("session {peer_addr} established as connection {id}");

    let (outbox, outbox_rx) = outbox::channel(config.control_queue_capacity);
    relay
        .connect(id, outbox)
        .await
        .context("relay stopped before the session could join")?;

    let (ws_tx, ws_rx) = ws_stream.split();

    let mut writer_task = tokio::spawn(run_writer(ws_tx, outbox_rx, config.ping_interval, id));
    let mut reader_task = tokio::spawn(read_loop(ws_rx, relay.clone(), id, config.idle_timeout));

    tokio::select! {
        _ = &mut writer_task => debug!("connection {id}: writer finished"),
        _ = &mut reader_task => debug!("connection {id}: reader finished"),
    }
    writer_task.abort();
    reader_task.abort();

    relay
        .disconnect(id)
        .await
        .context("relay stopped before the session could leave")?;
    Ok(())
}

/// Reads frames from one participant until it disconnects, errors or idles out.
async fn read_loop<S>(mut ws_rx: S, relay: RelayHandle, id: ConnectionId, idle_timeout: Duration)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    loop {
        let ws_msg = match timeout(idle_timeout, ws_rx.next()).await {
            Err(_) => {
                warn!("connection {id}: no traffic for {idle_timeout:?}; dropping");
                break;
            }
            Ok(None) => {
                debug!("connection {id}: stream ended");
                break;
            }
            Ok(Some(Err(WsError::ConnectionClosed | WsError::Protocol(_)))) => {
                debug!("connection {id}: closed");
                break;
            }
            Ok(Some(Err(e))) => {
                warn!("connection {id}: WebSocket error: {e}");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        let delivered = match ws_msg {
            WsMessage::Text(text) => match decode_client_msg(&text) {
                Ok(msg) => relay.message(id, msg).await,
                Err(e) => {
                    // One bad message does not end the session.
                    warn!("connection {id}: ignoring malformed message: {e}");
                    Ok(())
                }
            },
            WsMessage::Binary(bytes) => relay.frame(id, bytes).await,
            WsMessage::Close(_) => {
                debug!("connection {id}: Close frame received");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Ok(()),
        };

        if delivered.is_err() {
            error!("connection {id}: relay actor stopped");
            break;
        }
    }
}
