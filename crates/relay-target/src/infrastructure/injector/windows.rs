//! Windows input injection via the SendInput API.
//!
//! Keys are sent by virtual-key code. Text goes through `KEYEVENTF_UNICODE`,
//! so typed characters do not depend on the active keyboard layout. Pointer
//! moves use absolute coordinates over the whole virtual desktop.

#![cfg(target_os = "windows")]

use relay_core::{
    keymap::{hid_to_windows_vk, is_windows_extended},
    HidKeyCode, MouseButton,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE,
    MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN,
    MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
    MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::VirtualScreen;
use crate::application::inject::{InjectError, InputInjector};

/// One wheel notch in SendInput units.
const WHEEL_DELTA: i32 = 120;

/// [`InputInjector`] backed by `SendInput`.
#[derive(Debug, Default)]
pub struct SendInputInjector;

impl SendInputInjector {
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for SendInputInjector {
    fn key_down(&self, key: HidKeyCode) -> Result<(), InjectError> {
        send(&[key_input(key, false)?])
    }

    fn key_up(&self, key: HidKeyCode) -> Result<(), InjectError> {
        send(&[key_input(key, true)?])
    }

    fn tap(&self, key: HidKeyCode) -> Result<(), InjectError> {
        send(&[key_input(key, false)?, key_input(key, true)?])
    }

    fn type_char(&self, c: char) -> Result<(), InjectError> {
        let mut units = [0u16; 2];
        let encoded = c.encode_utf16(&mut units);
        let mut inputs = Vec::with_capacity(encoded.len() * 2);
        for &unit in encoded.iter() {
            inputs.push(unicode_input(unit, false));
            inputs.push(unicode_input(unit, true));
        }
        send(&inputs)
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), InjectError> {
        let (nx, ny) = virtual_screen().normalize(x, y);
        send(&[mouse_input(
            nx,
            ny,
            0,
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
        )])
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectError> {
        let (down, up) = match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
            MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
        };
        send(&[mouse_input(0, 0, 0, down), mouse_input(0, 0, 0, up)])
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
        // Positive wheel data scrolls up, so "down" is negative.
        if dy != 0 {
            send(&[mouse_input(0, 0, -dy * WHEEL_DELTA, MOUSEEVENTF_WHEEL)])?;
        }
        if dx != 0 {
            send(&[mouse_input(0, 0, dx * WHEEL_DELTA, MOUSEEVENTF_HWHEEL)])?;
        }
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn virtual_screen() -> VirtualScreen {
    // SAFETY: GetSystemMetrics has no preconditions.
    unsafe {
        VirtualScreen {
            left: GetSystemMetrics(SM_XVIRTUALSCREEN),
            top: GetSystemMetrics(SM_YVIRTUALSCREEN),
            width: GetSystemMetrics(SM_CXVIRTUALSCREEN),
            height: GetSystemMetrics(SM_CYVIRTUALSCREEN),
        }
    }
}

fn key_input(key: HidKeyCode, key_up: bool) -> Result<INPUT, InjectError> {
    let vk = hid_to_windows_vk(key);
    if vk == 0 {
        return Err(InjectError::UnmappedKey(key));
    }
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    if is_windows_extended(key) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    Ok(keyboard(VIRTUAL_KEY(vk), 0, flags))
}

fn unicode_input(unit: u16, key_up: bool) -> INPUT {
    let mut flags = KEYEVENTF_UNICODE;
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    keyboard(VIRTUAL_KEY(0), unit, flags)
}

fn keyboard(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), InjectError> {
    // SAFETY: every element is a fully initialised INPUT and the size matches.
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(InjectError::Platform(format!(
            "SendInput delivered {sent} of {} events: {}",
            inputs.len(),
            windows::core::Error::from_win32()
        )));
    }
    Ok(())
}
