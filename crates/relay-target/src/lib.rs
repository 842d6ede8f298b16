//! relay-target library entry point.
//!
//! The *target* is the machine being watched and controlled. The agent:
//!
//! 1. Connects to the relay over WebSocket and registers with the shared
//!    token, reconnecting when the connection drops.
//! 2. Captures one monitor at a fixed cadence, encodes it as JPEG and
//!    streams the frames to the relay.
//! 3. Replays routed viewer commands (pointer moves, clicks, scrolls, keys)
//!    through the platform input API.
//! 4. Holds injection text pushed by a viewer and types it with human-like
//!    timing when the local operator presses the toggle.

/// Application layer: typing engine, command dispatch and capture loop.
pub mod application;

/// Infrastructure layer: OS adapters, relay connection, local input and config.
pub mod infrastructure;
