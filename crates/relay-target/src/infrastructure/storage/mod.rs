//! Storage infrastructure: the agent's TOML configuration file.

pub mod config;

pub use config::{load_config_from, AgentConfig, ConfigError};
