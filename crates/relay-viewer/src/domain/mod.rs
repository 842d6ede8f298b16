//! Domain layer for relay-viewer.

pub mod config;

pub use config::ViewerConfig;
