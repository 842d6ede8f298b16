//! Per-connection outbound buffering.
//!
//! Every session owns one [`Outbox`] (held by the relay actor) and one
//! [`OutboxReceiver`] (held by the session's writer task).
//!
//! - **Control messages** go through a bounded queue. When a viewer stops
//!   reading and the queue fills up, further control messages for that viewer
//!   are dropped and logged; nobody else is affected.
//! - **Frames** go through a single-slot cell holding only the newest frame.
//!   A viewer that falls behind skips straight to the latest picture instead
//!   of accumulating a backlog.
//! - **Close** is a one-shot flag. The writer flushes whatever control
//!   messages are already queued, sends a WebSocket Close frame and exits.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, warn};

use relay_core::{encode, ConnectionId, RelayMsg};

/// Sending side of a connection's outbound buffers.
#[derive(Debug)]
pub struct Outbox {
    control: mpsc::Sender<RelayMsg>,
    frames: watch::Sender<Option<Arc<[u8]>>>,
    close: watch::Sender<bool>,
}

/// Receiving side, consumed by [`run_writer`].
#[derive(Debug)]
pub struct OutboxReceiver {
    control: mpsc::Receiver<RelayMsg>,
    frames: watch::Receiver<Option<Arc<[u8]>>>,
    close: watch::Receiver<bool>,
}

/// Creates a connected outbox pair with room for `capacity` control messages.
pub fn channel(capacity: usize) -> (Outbox, OutboxReceiver) {
    let (control_tx, control_rx) = mpsc::channel(capacity.max(1));
    let (frames_tx, frames_rx) = watch::channel(None);
    let (close_tx, close_rx) = watch::channel(false);
    (
        Outbox {
            control: control_tx,
            frames: frames_tx,
            close: close_tx,
        },
        OutboxReceiver {
            control: control_rx,
            frames: frames_rx,
            close: close_rx,
        },
    )
}

impl Outbox {
    /// Queues a control message without waiting.
    ///
    /// Returns `false` if the message was dropped because the queue is full
    /// or the writer has already exited.
    pub fn push_control(&self, msg: RelayMsg) -> bool {
        match self.control.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!("control queue full; dropping {}", msg.kind());
                false
            }
            Err(mpsc::error::TrySendError::Closed(msg)) => {
                debug!("writer gone; dropping {}", msg.kind());
                false
            }
        }
    }

    /// Replaces any frame the writer has not sent yet with `frame`.
    pub fn push_frame(&self, frame: Arc<[u8]>) {
        self.frames.send_replace(Some(frame));
    }

    /// Asks the writer to flush queued control messages and close the socket.
    pub fn close(&self) {
        self.close.send_replace(true);
    }
}

/// Drains an [`OutboxReceiver`] into a WebSocket sink until the connection
/// is closed or the outbox is dropped.
///
/// Control messages are sent before frames whenever both are ready, and a
/// WebSocket ping goes out every `ping_interval`.
pub async fn run_writer<S>(
    mut sink: S,
    mut rx: OutboxReceiver,
    ping_interval: Duration,
    id: ConnectionId,
) where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let mut ticker = interval(ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            biased;

            changed = rx.close.changed() => {
                if changed.is_err() || *rx.close.borrow() {
                    flush_and_close(&mut sink, &mut rx.control, id).await;
                    return;
                }
            }

            msg = rx.control.recv() => {
                let Some(msg) = msg else {
                    debug!("connection {id}: outbox dropped; closing writer");
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return;
                };
                if send_control(&mut sink, &msg, id).await.is_err() {
                    return;
                }
            }

            changed = rx.frames.changed() => {
                if changed.is_err() {
                    return;
                }
                let frame = rx.frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    if let Err(e) = sink.send(WsMessage::Binary(frame.to_vec())).await {
                        debug!("connection {id}: frame send failed: {e}");
                        return;
                    }
                }
            }

            _ = ticker.tick() => {
                if let Err(e) = sink.send(WsMessage::Ping(Vec::new())).await {
                    debug!("connection {id}: keepalive ping failed: {e}");
                    return;
                }
            }
        }
    }
}

async fn send_control<S>(sink: &mut S, msg: &RelayMsg, id: ConnectionId) -> Result<(), WsError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let text = match encode(msg) {
        Ok(text) => text,
        Err(e) => {
            // Skip the message but keep the connection.
            error!("connection {id}: failed to encode {}: {e}", msg.kind());
            return Ok(());
        }
    };
    sink.send(WsMessage::Text(text)).await.map_err(|e| {
        debug!("connection {id}: control send failed: {e}");
        e
    })
}

async fn flush_and_close<S>(sink: &mut S, control: &mut mpsc::Receiver<RelayMsg>, id: ConnectionId)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Ok(msg) = control.try_recv() {
        if send_control(sink, &msg, id).await.is_err() {
            return;
        }
    }
    debug!("connection {id}: closing");
    let _ = sink.send(WsMessage::Close(None)).await;
    let _ = sink.close().await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
