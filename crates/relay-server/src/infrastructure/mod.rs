//! Infrastructure layer for relay-server.
//!
//! # Responsibilities
//!
//! - Binding the WebSocket listener and upgrading each connection
//! - One reader and one writer task per session
//! - The relay actor: the single task that owns [`crate::application::RelayState`]
//! - Per-connection outboxes so a slow viewer never stalls the others
//!
//! # What does NOT belong here?
//!
//! - Slot, routing or authentication policy (application layer)

pub mod outbox;
pub mod relay_actor;
pub mod ws_server;

pub use relay_actor::{spawn_relay, RelayHandle, RelayStats};
pub use ws_server::{run_server, serve};
