//! The relay actor.
//!
//! One Tokio task owns the [`RelayState`] and the outbox of every live
//! connection. Sessions talk to it through a cloneable [`RelayHandle`]; each
//! request is processed to completion before the next one is read, so every
//! slot transition is atomic with respect to every other.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use relay_core::{ClientMsg, ConnectionId};

use crate::application::{Effect, RelayState};
use crate::domain::RelayConfig;
use crate::infrastructure::outbox::Outbox;

/// Requests buffered between sessions and the actor.
const REQUEST_QUEUE_CAPACITY: usize = 1024;

/// A snapshot of relay counters, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub connections: usize,
    pub occupant: Option<ConnectionId>,
    pub frames_broadcast: u64,
    pub frames_throttled: u64,
}

enum RelayRequest {
    Connect { id: ConnectionId, outbox: Outbox },
    Message { id: ConnectionId, msg: ClientMsg },
    Frame { id: ConnectionId, bytes: Vec<u8> },
    Disconnect { id: ConnectionId },
    Stats { reply: oneshot::Sender<RelayStats> },
}

/// Cloneable handle used by sessions to reach the relay actor.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayRequest>,
}

/// Error returned when the relay actor has stopped.
#[derive(Debug, thiserror::Error)]
#[error("relay actor has stopped")]
pub struct RelayGone;

impl RelayHandle {
    /// Registers a new connection together with its outbox.
    pub async fn connect(&self, id: ConnectionId, outbox: Outbox) -> Result<(), RelayGone> {
        self.send(RelayRequest::Connect { id, outbox }).await
    }

    /// Delivers a decoded control message from `id`.
    pub async fn message(&self, id: ConnectionId, msg: ClientMsg) -> Result<(), RelayGone> {
        self.send(RelayRequest::Message { id, msg }).await
    }

    /// Delivers a binary frame from `id`.
    pub async fn frame(&self, id: ConnectionId, bytes: Vec<u8>) -> Result<(), RelayGone> {
        self.send(RelayRequest::Frame { id, bytes }).await
    }

    /// Reports that the transport for `id` has gone away.
    pub async fn disconnect(&self, id: ConnectionId) -> Result<(), RelayGone> {
        self.send(RelayRequest::Disconnect { id }).await
    }

    pub async fn stats(&self) -> Result<RelayStats, RelayGone> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayRequest::Stats { reply }).await?;
        rx.await.map_err(|_| RelayGone)
    }

    async fn send(&self, req: RelayRequest) -> Result<(), RelayGone> {
        self.tx.send(req).await.map_err(|_| RelayGone)
    }
}

/// Spawns the relay actor and returns a handle to it.
///
/// The actor exits once every [`RelayHandle`] has been dropped.
pub fn spawn_relay(config: &RelayConfig) -> RelayHandle {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let state = RelayState::new(config);
    tokio::spawn(run_actor(state, rx));
    RelayHandle { tx }
}

async fn run_actor(mut state: RelayState, mut rx: mpsc::Receiver<RelayRequest>) {
    let mut outboxes: HashMap<ConnectionId, Outbox> = HashMap::new();
    let mut effects: Vec<Effect> = Vec::new();

    while let Some(req) = rx.recv().await {
        match req {
            RelayRequest::Connect { id, outbox } => {
                state.connect(id);
                outboxes.insert(id, outbox);
            }
            RelayRequest::Message { id, msg } => {
                debug!("connection {id}: {}", msg.kind());
                handle_message(&mut state, id, msg, &mut effects);
            }
            RelayRequest::Frame { id, bytes } => {
                state.broadcast_frame(id, bytes, Instant::now(), &mut effects);
            }
            RelayRequest::Disconnect { id } => {
                state.disconnect(id, &mut effects);
                outboxes.remove(&id);
            }
            RelayRequest::Stats { reply } => {
                let (frames_broadcast, frames_throttled) = state.frame_counts();
                let _ = reply.send(RelayStats {
                    connections: state.connection_count(),
                    occupant: state.occupant(),
                    frames_broadcast,
                    frames_throttled,
                });
            }
        }
        apply_effects(&outboxes, effects.drain(..));
    }

    info!("relay actor stopped");
}

fn handle_message(state: &mut RelayState, id: ConnectionId, msg: ClientMsg, out: &mut Vec<Effect>) {
    match msg {
        ClientMsg::Authenticate { secret } => {
            state.authenticate(id, &secret, out);
        }
        ClientMsg::Register { token } => {
            state.register_target(id, &token, out);
        }
        ClientMsg::Command { command } => {
            state.route_command(id, command, out);
        }
        ClientMsg::SetInjectionText { text } => {
            state.set_injection_text(id, text, out);
        }
    }
}

fn apply_effects(outboxes: &HashMap<ConnectionId, Outbox>, effects: impl Iterator<Item = Effect>) {
    for effect in effects {
        match effect {
            Effect::Send(id, msg) => match outboxes.get(&id) {
                Some(outbox) => {
                    outbox.push_control(msg);
                }
                None => debug!("connection {id} already gone; dropping {}", msg.kind()),
            },
            Effect::Frame { recipients, frame } => {
                for id in recipients {
                    if let Some(outbox) = outboxes.get(&id) {
                        outbox.push_frame(frame.clone());
                    }
                }
            }
            Effect::Close(id) => {
                if let Some(outbox) = outboxes.get(&id) {
                    outbox.close();
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
