//! CommandDispatcher: replays routed viewer commands on the local desktop.
//!
//! Commands arrive in frame coordinates. The dispatcher shifts them by the
//! captured monitor's origin, resolves browser key names to HID usages and
//! hands the result to an [`InputInjector`]. A transient injector failure
//! is retried a few times with a growing pause before the command is
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{keymap::resolve_dom_key, ControlCommand, HidKeyCode};
use tracing::{debug, warn};

use crate::application::inject::{InjectError, InputInjector};

/// Delay between moving to a click position and pressing the button.
pub const CLICK_SETTLE: Duration = Duration::from_millis(20);

/// Attempts per command, first one included.
pub const DISPATCH_ATTEMPTS: u32 = 3;

/// Pause after the first failed attempt; doubles on each further failure.
pub const DISPATCH_BACKOFF: Duration = Duration::from_millis(50);

/// The typing hotkey. It belongs to the target operator and is never
/// replayed from a viewer.
const RESERVED_KEY: HidKeyCode = HidKeyCode::F2;

/// What the dispatcher did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Injected,
    /// The command was valid but intentionally not replayed.
    Skipped,
}

/// Filters consecutive moves to the same position.
#[derive(Default)]
struct DedupFilter {
    last_pointer: Option<(i32, i32)>,
}

impl DedupFilter {
    fn is_duplicate(&self, x: i32, y: i32) -> bool {
        self.last_pointer == Some((x, y))
    }

    fn moved_to(&mut self, x: i32, y: i32) {
        self.last_pointer = Some((x, y));
    }

    fn reset(&mut self) {
        self.last_pointer = None;
    }
}

/// Replays [`ControlCommand`]s through an injector.
///
/// All calls block; the click path sleeps for [`CLICK_SETTLE`].
pub struct CommandDispatcher {
    injector: Arc<dyn InputInjector>,
    origin: (i32, i32),
    click_settle: Duration,
    attempts: u32,
    backoff: Duration,
    dedup: DedupFilter,
}

impl CommandDispatcher {
    /// Creates a dispatcher whose coordinates are relative to `origin`, the
    /// top-left corner of the captured monitor on the virtual desktop.
    pub fn new(injector: Arc<dyn InputInjector>, origin: (i32, i32)) -> Self {
        Self {
            injector,
            origin,
            click_settle: CLICK_SETTLE,
            attempts: DISPATCH_ATTEMPTS,
            backoff: DISPATCH_BACKOFF,
            dedup: DedupFilter::default(),
        }
    }

    pub fn with_click_settle(mut self, settle: Duration) -> Self {
        self.click_settle = settle;
        self
    }

    /// Overrides [`DISPATCH_ATTEMPTS`] and [`DISPATCH_BACKOFF`].
    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Replays one command, retrying transient injector failures.
    ///
    /// # Errors
    ///
    /// Returns the last [`InjectError`] once the attempts are used up, or the
    /// first one that is not transient.
    pub fn dispatch_with_retry(
        &mut self,
        command: &ControlCommand,
    ) -> Result<Dispatched, InjectError> {
        let mut backoff = self.backoff;
        let mut attempt = 1;
        loop {
            match self.dispatch(command) {
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        "{} failed (attempt {attempt}/{}): {e}; retrying in {backoff:?}",
                        command.action(),
                        self.attempts
                    );
                    std::thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Replays one command.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError`] if the injector fails. Unmapped keys are not
    /// errors; they are logged and skipped.
    pub fn dispatch(&mut self, command: &ControlCommand) -> Result<Dispatched, InjectError> {
        match command {
            ControlCommand::Move { x, y } => {
                let (x, y) = self.to_desktop(*x, *y);
                if self.dedup.is_duplicate(x, y) {
                    return Ok(Dispatched::Skipped);
                }
                self.injector.move_to(x, y)?;
                self.dedup.moved_to(x, y);
            }
            ControlCommand::Click { button, x, y } => {
                let (x, y) = self.to_desktop(*x, *y);
                self.injector.move_to(x, y)?;
                self.dedup.moved_to(x, y);
                if !self.click_settle.is_zero() {
                    std::thread::sleep(self.click_settle);
                }
                self.injector.click(*button)?;
            }
            ControlCommand::Scroll { dx, dy } => {
                if *dx == 0 && *dy == 0 {
                    return Ok(Dispatched::Skipped);
                }
                self.injector.scroll(*dx, *dy)?;
            }
            ControlCommand::KeyDown { key, code, .. } => {
                let Some(hid) = self.resolve(key, code) else {
                    return Ok(Dispatched::Skipped);
                };
                self.injector.key_down(hid)?;
            }
            ControlCommand::KeyUp { key, code } => {
                let Some(hid) = self.resolve(key, code) else {
                    return Ok(Dispatched::Skipped);
                };
                self.injector.key_up(hid)?;
            }
        }
        Ok(Dispatched::Injected)
    }

    /// Forgets the last pointer position. Called on every registration so a
    /// new viewer session's first move is never filtered.
    pub fn reset(&mut self) {
        self.dedup.reset();
    }

    fn to_desktop(&self, x: i32, y: i32) -> (i32, i32) {
        (x.saturating_add(self.origin.0), y.saturating_add(self.origin.1))
    }

    fn resolve(&self, key: &str, code: &str) -> Option<HidKeyCode> {
        match resolve_dom_key(key, code) {
            Some(RESERVED_KEY) => {
                debug!("ignoring routed {RESERVED_KEY:?}: reserved for the local typing toggle");
                None
            }
            Some(hid) => Some(hid),
            None => {
                warn!("unmapped key ignored (key={key:?}, code={code:?})");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
