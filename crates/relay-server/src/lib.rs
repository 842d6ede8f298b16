//! relay-server library crate.
//!
//! The relay sits between one *target* (the machine being controlled) and any
//! number of *viewers*. It owns the single-occupant target slot, fans frames
//! out to viewers at a bounded rate and routes viewer commands to whichever
//! target currently holds the slot.
//!
//! # Architecture
//!
//! ```text
//! Target / Viewers (JSON + binary over WebSocket)
//!         ↕
//! [relay-server]
//!   ├── domain/           RelayConfig
//!   ├── application/      RelayState: the slot state machine (pure, no I/O)
//!   └── infrastructure/
//!         ├── outbox       per-connection bounded control queue + latest-frame cell
//!         ├── relay_actor  the one task that owns RelayState
//!         └── ws_server    WebSocket accept loop and per-session reader/writer
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `relay-core` only; every operation
//!   returns a list of [`application::Effect`]s instead of performing I/O.
//! - `infrastructure` turns effects into socket writes.

/// Domain layer: configuration.
pub mod domain;

/// Application layer: the slot state machine.
pub mod application;

/// Infrastructure layer: actor, outboxes and the WebSocket server.
pub mod infrastructure;
