//! The input injection seam.
//!
//! Everything the target does to the local desktop (pointer moves, clicks,
//! key presses, typed characters) goes through [`InputInjector`]. Platform
//! implementations live in `infrastructure::injector`; tests use the
//! recording mock from the same module.

use relay_core::{HidKeyCode, MouseButton};
use thiserror::Error;

/// Error type for input injection.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The input backend could not be opened (no display, missing permission).
    #[error("input backend unavailable: {0}")]
    Unavailable(String),

    /// The OS rejected or failed to deliver an event.
    #[error("platform error: {0}")]
    Platform(String),

    /// The key has no native code on this platform.
    #[error("no native key code for {0:?}")]
    UnmappedKey(HidKeyCode),

    /// The character cannot be produced by this backend.
    #[error("character {0:?} cannot be typed")]
    UnsupportedChar(char),
}

impl InjectError {
    /// Whether trying the same call again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Platform(_))
    }
}

/// Platform-agnostic input injection.
///
/// Calls are blocking and may be made from any thread: the typing engine
/// drives an injector from its own OS thread while the command dispatcher
/// uses it from the async runtime.
pub trait InputInjector: Send + Sync {
    /// Presses a key.
    fn key_down(&self, key: HidKeyCode) -> Result<(), InjectError>;

    /// Releases a key.
    fn key_up(&self, key: HidKeyCode) -> Result<(), InjectError>;

    /// Presses and releases a key.
    fn tap(&self, key: HidKeyCode) -> Result<(), InjectError> {
        self.key_down(key)?;
        self.key_up(key)
    }

    /// Types one character as text, independent of the keyboard layout where
    /// the platform allows it.
    fn type_char(&self, c: char) -> Result<(), InjectError>;

    /// Moves the pointer to absolute desktop coordinates.
    fn move_to(&self, x: i32, y: i32) -> Result<(), InjectError>;

    /// Clicks `button` at the current pointer position.
    fn click(&self, button: MouseButton) -> Result<(), InjectError>;

    /// Scrolls by whole notches. `dy > 0` scrolls down, `dx > 0` scrolls right.
    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectError>;
}
