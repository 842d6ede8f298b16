//! Linux X11 input injection via the XTest extension.
//!
//! ```text
//! HID usage → X11 KeySym → XKeysymToKeycode(display, keysym) → keycode
//! ```
//!
//! Text is typed through the same path: characters on the US layout use
//! their key (with Shift when needed), anything else is looked up by its
//! Unicode KeySym and fails with [`InjectError::UnsupportedChar`] when the
//! server's keymap has no key for it.
//!
//! Scrolling is expressed as button clicks: 4 up, 5 down, 6 left, 7 right.

#![cfg(all(target_os = "linux", feature = "xtest"))]

use std::ptr;
use std::sync::{Mutex, PoisonError};

use relay_core::{
    keymap::{hid_for_char, hid_to_x11_keysym},
    HidKeyCode, MouseButton,
};
use x11::{xlib, xtest};

use crate::application::inject::{InjectError, InputInjector};

/// `CurrentTime`: let the server timestamp synthesized events.
const CURRENT_TIME: xlib::Time = 0;

/// KeySyms for code points above Latin-1 are offset by this value.
const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;

const SCROLL_UP: u32 = 4;
const SCROLL_DOWN: u32 = 5;
const SCROLL_LEFT: u32 = 6;
const SCROLL_RIGHT: u32 = 7;

struct Display(*mut xlib::Display);

// SAFETY: the pointer is only dereferenced by Xlib while the mutex is held.
unsafe impl Send for Display {}

/// [`InputInjector`] backed by XTest on the default display.
pub struct XTestInjector {
    display: Mutex<Display>,
}

impl XTestInjector {
    /// Connects to `$DISPLAY`.
    pub fn open() -> Result<Self, InjectError> {
        // SAFETY: a null name selects $DISPLAY; the result is checked below.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            return Err(InjectError::Unavailable(
                "cannot open X display (is DISPLAY set?)".into(),
            ));
        }
        Ok(Self {
            display: Mutex::new(Display(display)),
        })
    }

    fn with_display<T>(&self, f: impl FnOnce(*mut xlib::Display) -> T) -> T {
        let guard = self.display.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(guard.0);
        // SAFETY: the display stays open for the injector's lifetime.
        unsafe { xlib::XFlush(guard.0) };
        out
    }

    fn keycode(display: *mut xlib::Display, keysym: u32) -> Option<u32> {
        // SAFETY: display is open; unknown keysyms yield 0.
        let code = unsafe { xlib::XKeysymToKeycode(display, xlib::KeySym::from(keysym)) };
        (code != 0).then_some(u32::from(code))
    }

    fn fake_key(display: *mut xlib::Display, keycode: u32, press: bool) -> Result<(), InjectError> {
        // SAFETY: display is open and keycode came from the server.
        let ok = unsafe { xtest::XTestFakeKeyEvent(display, keycode, i32::from(press), CURRENT_TIME) };
        if ok == 0 {
            return Err(InjectError::Platform(format!("XTestFakeKeyEvent({keycode}) failed")));
        }
        Ok(())
    }

    fn fake_button(display: *mut xlib::Display, button: u32) -> Result<(), InjectError> {
        for press in [true, false] {
            // SAFETY: display is open.
            let ok = unsafe {
                xtest::XTestFakeButtonEvent(display, button, i32::from(press), CURRENT_TIME)
            };
            if ok == 0 {
                return Err(InjectError::Platform(format!("XTestFakeButtonEvent({button}) failed")));
            }
        }
        Ok(())
    }

    fn hid_keycode(display: *mut xlib::Display, key: HidKeyCode) -> Result<u32, InjectError> {
        let keysym = hid_to_x11_keysym(key);
        if keysym == 0 {
            return Err(InjectError::UnmappedKey(key));
        }
        Self::keycode(display, keysym).ok_or(InjectError::UnmappedKey(key))
    }
}

impl Drop for XTestInjector {
    fn drop(&mut self) {
        let guard = self.display.lock().unwrap_or_else(PoisonError::into_inner);
        // SAFETY: opened in `open` and never closed elsewhere.
        unsafe { xlib::XCloseDisplay(guard.0) };
    }
}

impl InputInjector for XTestInjector {
    fn key_down(&self, key: HidKeyCode) -> Result<(), InjectError> {
        self.with_display(|d| Self::fake_key(d, Self::hid_keycode(d, key)?, true))
    }

    fn key_up(&self, key: HidKeyCode) -> Result<(), InjectError> {
        self.with_display(|d| Self::fake_key(d, Self::hid_keycode(d, key)?, false))
    }

    fn type_char(&self, c: char) -> Result<(), InjectError> {
        self.with_display(|d| {
            if let Some((hid, shift)) = hid_for_char(c) {
                let code = Self::hid_keycode(d, hid)?;
                let shift_code = Self::hid_keycode(d, HidKeyCode::ShiftLeft)?;
                if shift {
                    Self::fake_key(d, shift_code, true)?;
                }
                let typed = Self::fake_key(d, code, true).and_then(|()| Self::fake_key(d, code, false));
                if shift {
                    Self::fake_key(d, shift_code, false)?;
                }
                return typed;
            }

            let cp = u32::from(c);
            let keysym = if cp <= 0xFF { cp } else { UNICODE_KEYSYM_BASE | cp };
            let code = Self::keycode(d, keysym).ok_or(InjectError::UnsupportedChar(c))?;
            Self::fake_key(d, code, true)?;
            Self::fake_key(d, code, false)
        })
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), InjectError> {
        self.with_display(|d| {
            // SAFETY: display is open; -1 selects the pointer's current screen.
            let ok = unsafe { xtest::XTestFakeMotionEvent(d, -1, x, y, CURRENT_TIME) };
            if ok == 0 {
                return Err(InjectError::Platform("XTestFakeMotionEvent failed".into()));
            }
            Ok(())
        })
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectError> {
        let number = match button {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        };
        self.with_display(|d| Self::fake_button(d, number))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.with_display(|d| {
            let vertical = if dy > 0 { SCROLL_DOWN } else { SCROLL_UP };
            for _ in 0..dy.unsigned_abs() {
                Self::fake_button(d, vertical)?;
            }
            let horizontal = if dx > 0 { SCROLL_RIGHT } else { SCROLL_LEFT };
            for _ in 0..dx.unsigned_abs() {
                Self::fake_button(d, horizontal)?;
            }
            Ok(())
        })
    }
}
