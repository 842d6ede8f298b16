//! Application layer for relay-viewer: pure logic with no sockets.

pub mod console;
pub mod frame_stats;

pub use console::{parse_line, ParseError, ViewerInput};
pub use frame_stats::FrameStats;
