//! Infrastructure layer for relay-viewer.
//!
//! - **`session`** – the WebSocket connection to the relay.

pub mod session;

pub use session::{ViewerError, ViewerEvent, ViewerSession};
