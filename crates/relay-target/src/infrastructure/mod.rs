//! Infrastructure layer for the target agent.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `relay_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`injector`** – OS-specific [`InputInjector`] implementations, chosen at
//!   compile time, plus a recording mock for tests.
//! - **`capture`** – monitor enumeration, GDI screen grabbing and JPEG encoding.
//! - **`relay_client`** – WebSocket connection to the relay with reconnect.
//! - **`local_input`** – console and hotkey controls for the typing engine.
//! - **`storage`** – TOML configuration.
//! - **`agent`** – wires everything together.
//!
//! [`InputInjector`]: crate::application::inject::InputInjector

pub mod agent;
pub mod capture;
pub mod injector;
pub mod local_input;
pub mod relay_client;
pub mod storage;

pub use agent::{run_agent, TargetAgent};
pub use relay_client::{ClientExit, RelayClient, RelayClientConfig, RelayEvent};
