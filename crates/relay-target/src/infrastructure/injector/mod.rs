//! Platform input injectors.
//!
//! The backend is chosen at compile time:
//!
//! | Platform | Backend | Notes |
//! |----------|---------|-------|
//! | Windows  | [`windows::SendInputInjector`] | always available |
//! | Linux    | [`xtest::XTestInjector`] | needs the `xtest` feature and an X display |
//! | other    | [`LoggingInjector`] | logs instead of injecting |

use std::sync::Arc;

use relay_core::{HidKeyCode, MouseButton};
use tracing::debug;

use crate::application::inject::{InjectError, InputInjector};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(all(target_os = "linux", feature = "xtest"))]
pub mod xtest;

/// The absolute-coordinate range Windows and most virtual input devices use.
pub const ABSOLUTE_MAX: i32 = 65_535;

/// Bounds of the virtual desktop spanning all monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualScreen {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualScreen {
    /// Maps desktop pixels to `[0, ABSOLUTE_MAX]` on both axes, clamping
    /// points outside the desktop to its edge.
    pub fn normalize(&self, x: i32, y: i32) -> (i32, i32) {
        (
            scale_axis(x - self.left, self.width),
            scale_axis(y - self.top, self.height),
        )
    }
}

fn scale_axis(offset: i32, extent: i32) -> i32 {
    if extent <= 1 {
        return 0;
    }
    let scaled = i64::from(offset) * i64::from(ABSOLUTE_MAX) / i64::from(extent - 1);
    scaled.clamp(0, i64::from(ABSOLUTE_MAX)) as i32
}

/// Injector for platforms without a backend. Every call succeeds and is
/// logged at debug level.
#[derive(Debug, Default)]
pub struct LoggingInjector;

impl InputInjector for LoggingInjector {
    fn key_down(&self, key: HidKeyCode) -> Result<(), InjectError> {
        debug!("key down {key:?} (not injected)");
        Ok(())
    }

    fn key_up(&self, key: HidKeyCode) -> Result<(), InjectError> {
        debug!("key up {key:?} (not injected)");
        Ok(())
    }

    fn type_char(&self, c: char) -> Result<(), InjectError> {
        debug!("type {c:?} (not injected)");
        Ok(())
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), InjectError> {
        debug!("move to ({x}, {y}) (not injected)");
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectError> {
        debug!("click {button:?} (not injected)");
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
        debug!("scroll ({dx}, {dy}) (not injected)");
        Ok(())
    }
}

/// Opens the injector for the current platform.
///
/// Falls back to [`LoggingInjector`] with a warning when the platform has no
/// backend compiled in.
pub fn platform_injector() -> Result<Arc<dyn InputInjector>, InjectError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::SendInputInjector::new()))
    }

    #[cfg(all(target_os = "linux", feature = "xtest"))]
    {
        Ok(Arc::new(xtest::XTestInjector::open()?))
    }

    #[cfg(not(any(target_os = "windows", all(target_os = "linux", feature = "xtest"))))]
    {
        tracing::warn!("no input backend for this build; commands and typing will only be logged");
        Ok(Arc::new(LoggingInjector))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
