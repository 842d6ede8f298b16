//! relay-viewer library crate.
//!
//! A command-line viewer for the Screen Relay: it authenticates with the
//! viewer secret, receives the current target's frames and status events,
//! and sends pointer, keyboard and injection-text requests.
//!
//! ```text
//! relay-viewer
//!   ├── domain/           ViewerConfig
//!   ├── application/      console line parser, frame statistics
//!   └── infrastructure/   ViewerSession (tokio-tungstenite client)
//! ```
//!
//! `domain` and `application` do no I/O; `infrastructure` owns the socket.

/// Domain layer: configuration.
pub mod domain;

/// Application layer: console parsing and frame accounting.
pub mod application;

/// Infrastructure layer: WebSocket session with the relay.
pub mod infrastructure;
