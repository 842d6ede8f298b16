//! Windows screen capture via GDI.
//!
//! Monitors are enumerated with `EnumDisplayMonitors`; each capture copies
//! the monitor's rectangle from the screen DC with `BitBlt` and reads it
//! back as 32-bit top-down BGRA with `GetDIBits`.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject,
    EnumDisplayMonitors, GetDC, GetDIBits, GetMonitorInfoW, ReleaseDC, SelectObject,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HDC, HMONITOR, MONITORINFOEXW,
    SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::{encode_jpeg, MonitorRect};
use crate::application::capture::{CaptureError, FrameSource};

const MONITORINFOF_PRIMARY: u32 = 1;

/// Lists the virtual desktop followed by each monitor, primary first.
pub fn enumerate_monitors() -> Result<Vec<MonitorRect>, CaptureError> {
    let mut monitors: Vec<MonitorRect> = Vec::new();

    // SAFETY: the callback only runs inside this call and `monitors`
    // outlives it.
    unsafe {
        let _ = EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(monitor_enum_proc),
            LPARAM(&mut monitors as *mut Vec<MonitorRect> as isize),
        );
    }

    if monitors.is_empty() {
        return Err(CaptureError::Unavailable(
            "EnumDisplayMonitors returned no monitors".into(),
        ));
    }
    monitors.sort_by_key(|m| !m.primary);

    // SAFETY: GetSystemMetrics has no preconditions.
    let desktop = unsafe {
        MonitorRect {
            left: GetSystemMetrics(SM_XVIRTUALSCREEN),
            top: GetSystemMetrics(SM_YVIRTUALSCREEN),
            width: GetSystemMetrics(SM_CXVIRTUALSCREEN).max(0) as u32,
            height: GetSystemMetrics(SM_CYVIRTUALSCREEN).max(0) as u32,
            primary: false,
        }
    };
    monitors.insert(0, desktop);
    Ok(monitors)
}

/// # Safety
///
/// Called by Win32 inside `EnumDisplayMonitors`; `lparam` points to the
/// `Vec<MonitorRect>` passed there.
unsafe extern "system" fn monitor_enum_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let monitors = &mut *(lparam.0 as *mut Vec<MonitorRect>);

    let mut info: MONITORINFOEXW = std::mem::zeroed();
    info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;

    if GetMonitorInfoW(hmonitor, &mut info.monitorInfo).as_bool() {
        let rc = info.monitorInfo.rcMonitor;
        monitors.push(MonitorRect {
            left: rc.left,
            top: rc.top,
            width: (rc.right - rc.left).max(0) as u32,
            height: (rc.bottom - rc.top).max(0) as u32,
            primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
        });
    }
    BOOL(1)
}

/// Captures one monitor rectangle through GDI.
pub struct GdiSource {
    rect: MonitorRect,
    quality: u8,
}

impl GdiSource {
    pub fn new(rect: MonitorRect, quality: u8) -> Self {
        Self { rect, quality }
    }

    fn grab_bgra(&self) -> Result<Vec<u8>, CaptureError> {
        let (w, h) = (self.rect.width as i32, self.rect.height as i32);
        if w <= 0 || h <= 0 {
            return Err(CaptureError::Unavailable(format!("empty monitor {:?}", self.rect)));
        }
        let mut pixels = vec![0u8; w as usize * h as usize * 4];

        // SAFETY: every handle created here is released before returning and
        // `pixels` is large enough for the requested 32-bit rows.
        unsafe {
            let screen = GetDC(HWND::default());
            if screen.is_invalid() {
                return Err(CaptureError::Grab("GetDC failed".into()));
            }
            let mem = CreateCompatibleDC(screen);
            let bitmap = CreateCompatibleBitmap(screen, w, h);
            let previous = SelectObject(mem, bitmap);

            let blit = BitBlt(mem, 0, 0, w, h, screen, self.rect.left, self.rect.top, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    biHeight: -h,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let lines = GetDIBits(
                mem,
                bitmap,
                0,
                h as u32,
                Some(pixels.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem, previous);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem);
            ReleaseDC(HWND::default(), screen);

            blit.map_err(|e| CaptureError::Grab(format!("BitBlt failed: {e}")))?;
            if lines != h {
                return Err(CaptureError::Grab(format!("GetDIBits copied {lines} of {h} rows")));
            }
        }
        Ok(pixels)
    }
}

impl FrameSource for GdiSource {
    fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        let bgra = self.grab_bgra()?;
        let rgb: Vec<u8> = bgra
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        encode_jpeg(&rgb, self.rect.width, self.rect.height, self.quality)
    }

    fn origin(&self) -> (i32, i32) {
        (self.rect.left, self.rect.top)
    }
}
