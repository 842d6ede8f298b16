//! Application layer for relay-server.
//!
//! The application layer decides *what* happens when a participant connects,
//! authenticates, registers, sends a command or disconnects. It never touches
//! a socket; the infrastructure layer carries out the returned effects.
//!
//! # What does NOT belong here?
//!
//! - WebSocket framing or task spawning (infrastructure)
//! - CLI parsing (`main.rs`)

pub mod relay_state;

pub use relay_state::{
    AuthOutcome, Effect, FrameOutcome, InjectionOutcome, RegisterOutcome, RelayState,
    RouteOutcome,
};
