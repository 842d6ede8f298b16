//! Domain layer: pure relay policy with no I/O.

pub mod connection;
pub mod throttle;

pub use connection::{ConnectionId, Role};
pub use throttle::{min_interval_for_fps, FrameThrottle, ThrottleDecision};
