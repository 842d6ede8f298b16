//! # relay-core
//!
//! Shared library for Screen Relay containing the JSON control protocol, the
//! key translation tables and the frame throttle.
//!
//! This crate is used by the relay server, the target connector and the
//! viewer. It has no dependencies on OS APIs or network sockets.
//!
//! # Architecture overview
//!
//! Screen Relay lets one or more remote *viewers* watch and control a single
//! *target* machine through a *relay*. The target streams JPEG frames to the
//! relay, the relay fans them out to authenticated viewers, and viewers send
//! pointer/keyboard commands back through the relay to whichever target
//! currently holds the slot.
//!
//! - **`protocol`** – The JSON messages exchanged over WebSocket text frames
//!   and the control commands they carry. Screen frames travel as binary
//!   WebSocket frames and are never parsed.
//!
//! - **`keymap`** – Translation from browser `KeyboardEvent.code` /
//!   `KeyboardEvent.key` names to USB HID usage IDs, and from HID to each
//!   platform's native key code.
//!
//! - **`domain`** – Pure relay policy: connection identity and the
//!   drop-not-queue frame throttle.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::connection::{ConnectionId, Role};
pub use domain::throttle::{FrameThrottle, ThrottleDecision};
pub use keymap::hid::HidKeyCode;
pub use protocol::codec::{decode_client_msg, decode_relay_msg, encode, ProtocolError};
pub use protocol::messages::{
    AckStatus, ClientMsg, ControlCommand, Modifiers, MouseButton, RelayMsg,
};
