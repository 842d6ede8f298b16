//! Frame sources: screen grabbing and JPEG encoding.
//!
//! Monitor indices follow the usual screen-grabber convention: index 0 is
//! the whole virtual desktop, 1 is the primary monitor and the rest follow.
//! An out-of-range index falls back to 0.

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use tracing::warn;

use crate::application::capture::{CaptureError, FrameSource};

pub mod test_pattern;

#[cfg(target_os = "windows")]
pub mod windows;

pub use test_pattern::TestPatternSource;

/// Whether this build can grab the real screen.
pub const HAS_CAPTURE_BACKEND: bool = cfg!(target_os = "windows");

/// Shown wherever a platform without a capture backend matters.
pub const NO_CAPTURE_BACKEND: &str = "screen capture is implemented for Windows only; \
     on this platform the target streams a synthetic test pattern instead of the screen";

/// A capturable area in virtual-desktop pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub primary: bool,
}

/// Returns `monitors[index]`, or the whole desktop at index 0 when `index`
/// is out of range. `None` only for an empty list.
pub fn select_monitor(monitors: &[MonitorRect], index: usize) -> Option<(usize, MonitorRect)> {
    if let Some(m) = monitors.get(index) {
        return Some((index, *m));
    }
    if !monitors.is_empty() {
        warn!(
            "monitor index {index} out of range ({} available); using 0",
            monitors.len()
        );
    }
    monitors.first().map(|m| (0, *m))
}

/// Compresses tightly packed RGB pixels to JPEG.
pub fn encode_jpeg(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(CaptureError::Encode(format!(
            "expected {expected} bytes for {width}x{height} RGB, got {}",
            rgb.len()
        )));
    }
    let mut out = Vec::with_capacity(rgb.len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(out)
}

/// Lists the capturable areas, whole desktop first.
pub fn list_monitors() -> Result<Vec<MonitorRect>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        windows::enumerate_monitors()
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::Unavailable(NO_CAPTURE_BACKEND.into()))
    }
}

/// Opens the frame source for `monitor_index`.
///
/// Without a capture backend this falls back to a synthetic test pattern so
/// the rest of the pipeline can still be exercised.
pub fn platform_source(monitor_index: usize, quality: u8) -> Result<Box<dyn FrameSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        let monitors = windows::enumerate_monitors()?;
        let (index, rect) = select_monitor(&monitors, monitor_index)
            .ok_or_else(|| CaptureError::Unavailable("no monitors found".into()))?;
        tracing::info!("capturing monitor {index}: {rect:?}");
        Ok(Box::new(windows::GdiSource::new(rect, quality)))
    }

    #[cfg(not(target_os = "windows"))]
    {
        tracing::info!("streaming a test pattern; monitor {monitor_index} ignored");
        Ok(Box::new(TestPatternSource::new(640, 360, quality)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
