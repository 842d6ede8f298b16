//! Recording injector for tests.
//!
//! Every call is appended to [`MockInjector::events`] in order, so a test can
//! assert on the exact sequence of keys and pointer actions an operation
//! produced without touching the real desktop.
//!
//! # Failure injection
//!
//! - `should_fail = true` makes every call fail.
//! - `fail_after = Some(n)` lets the first `n` calls succeed and fails the rest.
//! - `fail_calls = n..m` fails only calls `n` to `m - 1`, then recovers.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use relay_core::{HidKeyCode, MouseButton};

use crate::application::inject::{InjectError, InputInjector};

/// One recorded injector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedEvent {
    KeyDown(HidKeyCode),
    KeyUp(HidKeyCode),
    Char(char),
    Move(i32, i32),
    Click(MouseButton),
    Scroll(i32, i32),
}

/// An injector that records calls instead of performing them.
#[derive(Debug, Default)]
pub struct MockInjector {
    pub events: Mutex<Vec<InjectedEvent>>,
    pub should_fail: bool,
    pub fail_after: Option<usize>,
    pub fail_calls: Range<usize>,
    calls: AtomicUsize,
}

impl MockInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// An injector whose first `n` calls succeed and the rest fail.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// An injector whose every call fails.
    pub fn always_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// An injector where only calls `calls.start..calls.end` fail.
    pub fn failing_calls(calls: Range<usize>) -> Self {
        Self {
            fail_calls: calls,
            ..Self::default()
        }
    }

    /// Number of calls made so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the events recorded so far.
    pub fn recorded(&self) -> Vec<InjectedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The text produced so far, applying backspaces, Enter and Tab the way a
    /// text field would.
    pub fn typed_text(&self) -> String {
        let mut out = String::new();
        for event in self.recorded() {
            match event {
                InjectedEvent::Char(c) => out.push(c),
                InjectedEvent::KeyDown(HidKeyCode::Backspace) => {
                    out.pop();
                }
                InjectedEvent::KeyDown(HidKeyCode::Enter) => out.push('\n'),
                InjectedEvent::KeyDown(HidKeyCode::Tab) => out.push('\t'),
                _ => {}
            }
        }
        out
    }

    fn record(&self, event: InjectedEvent) -> Result<(), InjectError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail
            || self.fail_after.is_some_and(|limit| n >= limit)
            || self.fail_calls.contains(&n)
        {
            return Err(InjectError::Platform("mock failure".into()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl InputInjector for MockInjector {
    fn key_down(&self, key: HidKeyCode) -> Result<(), InjectError> {
        self.record(InjectedEvent::KeyDown(key))
    }

    fn key_up(&self, key: HidKeyCode) -> Result<(), InjectError> {
        self.record(InjectedEvent::KeyUp(key))
    }

    fn type_char(&self, c: char) -> Result<(), InjectError> {
        self.record(InjectedEvent::Char(c))
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), InjectError> {
        self.record(InjectedEvent::Move(x, y))
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectError> {
        self.record(InjectedEvent::Click(button))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
        self.record(InjectedEvent::Scroll(dx, dy))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_records_down_then_up() {
        // Arrange
        let mock = MockInjector::new();

        // Act
        mock.tap(HidKeyCode::Enter).unwrap();

        // Assert
        assert_eq!(
            mock.recorded(),
            vec![
                InjectedEvent::KeyDown(HidKeyCode::Enter),
                InjectedEvent::KeyUp(HidKeyCode::Enter)
            ]
        );
    }

    #[test]
    fn test_typed_text_applies_backspace() {
        let mock = MockInjector::new();
        mock.type_char('a').unwrap();
        mock.type_char('x').unwrap();
        mock.tap(HidKeyCode::Backspace).unwrap();
        mock.type_char('b').unwrap();
        assert_eq!(mock.typed_text(), "ab");
    }

    #[test]
    fn test_should_fail_records_nothing() {
        let mock = MockInjector::always_failing();
        assert!(mock.move_to(1, 1).is_err());
        assert!(mock.recorded().is_empty());
    }

    #[test]
    fn test_failing_after_allows_first_calls() {
        let mock = MockInjector::failing_after(2);
        assert!(mock.type_char('a').is_ok());
        assert!(mock.type_char('b').is_ok());
        assert!(mock.type_char('c').is_err());
        assert_eq!(mock.typed_text(), "ab");
    }

    #[test]
    fn test_failing_calls_recovers_after_window() {
        let mock = MockInjector::failing_calls(1..3);
        assert!(mock.type_char('a').is_ok());
        assert!(mock.type_char('b').is_err());
        assert!(mock.type_char('c').is_err());
        assert!(mock.type_char('d').is_ok());
        assert_eq!(mock.typed_text(), "ad");
        assert_eq!(mock.call_count(), 4);
    }
}
