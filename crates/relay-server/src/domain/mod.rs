//! Domain layer for relay-server.

pub mod config;

pub use config::RelayConfig;
