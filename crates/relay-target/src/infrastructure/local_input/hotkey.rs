//! Windows global hotkeys: F2 toggles typing, Shift+F2 stops it.
//!
//! The hotkeys are registered on a dedicated thread, which then pumps its
//! message queue for `WM_HOTKEY` until the process exits.

#![cfg(target_os = "windows")]

use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, MOD_NOREPEAT, MOD_SHIFT, VK_F2,
};
use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, MSG, WM_HOTKEY};

use super::LocalAction;

const TOGGLE_ID: i32 = 1;
const STOP_ID: i32 = 2;

/// Registers the hotkeys and forwards presses to `tx`.
pub fn spawn_hotkeys(tx: mpsc::Sender<LocalAction>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("hotkeys".into()).spawn(move || {
        // SAFETY: hotkeys are bound to this thread's message queue, which
        // is only read below on the same thread.
        unsafe {
            if let Err(e) = RegisterHotKey(HWND::default(), TOGGLE_ID, MOD_NOREPEAT, u32::from(VK_F2.0)) {
                error!("could not register F2 hotkey: {e}");
                return;
            }
            if let Err(e) = RegisterHotKey(
                HWND::default(),
                STOP_ID,
                MOD_SHIFT | MOD_NOREPEAT,
                u32::from(VK_F2.0),
            ) {
                error!("could not register Shift+F2 hotkey: {e}");
            }
        }
        info!("hotkeys active: F2 toggles typing, Shift+F2 stops it");

        let mut msg = MSG::default();
        // SAFETY: msg is a valid out-parameter; a null window reads the
        // thread queue.
        while unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) }.as_bool() {
            if msg.message != WM_HOTKEY {
                continue;
            }
            let action = match msg.wParam.0 as i32 {
                TOGGLE_ID => LocalAction::Toggle,
                STOP_ID => LocalAction::Stop,
                other => {
                    debug!("unexpected hotkey id {other}");
                    continue;
                }
            };
            if tx.blocking_send(action).is_err() {
                break;
            }
        }
    })
}
