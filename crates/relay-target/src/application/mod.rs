//! Application layer: what the target does with relay traffic and local input.

pub mod capture;
pub mod dispatch;
pub mod inject;
pub mod typing;

pub use capture::{
    run_capture_loop, CaptureError, CaptureSettings, FrameSink, FrameSource, SinkError,
};
pub use dispatch::{CommandDispatcher, Dispatched};
pub use inject::{InjectError, InputInjector};
pub use typing::{PauseRange, TriggerOutcome, TypingConfig, TypingEngine, TypingState};
