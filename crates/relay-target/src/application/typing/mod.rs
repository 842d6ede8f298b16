//! Typing engine: replays injection text as keystrokes with human-like
//! timing and the occasional corrected slip.
//!
//! # State machine
//!
//! ```text
//!   Idle ──trigger (text available)──▶ Active ──trigger──▶ Paused
//!    ▲                                  │  ▲                  │
//!    │◀──────── completion ─────────────┘  └─────trigger──────┘
//!    │◀──────── stop / set_text / injector error (from Active or Paused)
//! ```
//!
//! The task itself runs on a dedicated OS thread because every injector call
//! blocks. The engine and the worker share one mutex-protected [`TypingState`]
//! plus a condition variable:
//!
//! - every sleep waits on the condition variable, so `stop` wakes it at once;
//! - a paused worker waits in `pause_poll` slices until resumed or stopped;
//! - each started task gets a generation number, and a worker whose number no
//!   longer matches exits before its next character.
//!
//! A stop lets the current character finish (including any slip and its
//! correction). An injector failure can cut a character short; the worker
//! then works out what that character left on screen, removes a stray slip
//! if the injector still answers, and otherwise records the backspaces a
//! resumed task owes. Either way `typed + remaining` equals the text once
//! the owed backspaces are applied.

pub mod mistakes;

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_core::HidKeyCode;
use tracing::{debug, error, info, warn};

use crate::application::inject::{InjectError, InputInjector};
use mistakes::{next_interval, plan_char, Step};

// ── Configuration ─────────────────────────────────────────────────────────────

/// An inclusive range of pause lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRange {
    pub min: Duration,
    pub max: Duration,
}

impl PauseRange {
    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Picks a pause uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Timing and mistake parameters for the typing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TypingConfig {
    /// Chance that an alphanumeric character is typed with a corrected slip.
    pub mistake_probability: f64,
    /// Mean delay between characters.
    pub base_interval: Duration,
    /// Maximum deviation from `base_interval`, either way.
    pub interval_variation: Duration,
    /// Lower bound for the delay between characters.
    pub min_interval: Duration,
    /// Pause before the backspace that removes a slip.
    pub backspace_pause: PauseRange,
    /// Pause after that backspace.
    pub correction_pause: PauseRange,
    /// Pause between the correct character and an inserted extra one.
    pub insertion_pause: PauseRange,
    /// Slice length while paused.
    pub pause_poll: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            mistake_probability: 0.025,
            base_interval: Duration::from_millis(120),
            interval_variation: Duration::from_millis(60),
            min_interval: Duration::from_millis(20),
            backspace_pause: PauseRange::from_millis(150, 400),
            correction_pause: PauseRange::from_millis(100, 300),
            insertion_pause: PauseRange::from_millis(10, 50),
            pause_poll: Duration::from_millis(100),
        }
    }
}

// ── Public state ──────────────────────────────────────────────────────────────

/// Where the engine is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingState {
    Idle,
    Active,
    Paused,
}

/// What a call to [`TypingEngine::trigger`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new task started on the pending text.
    Started { chars: usize },
    /// A task started on the suffix left by an injector failure.
    Resumed { chars: usize },
    /// The active task is now paused.
    Paused,
    /// The paused task is running again.
    Unpaused,
    /// Idle with no text to type.
    NothingToType,
}

// ── Shared state ──────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    state: TypingState,
    /// Text set by the last `set_text`; a fresh task types all of it.
    pending: String,
    /// Characters the last interrupted task did not type.
    remaining: String,
    /// `remaining` was left by a failure and the next trigger resumes it.
    resumable: bool,
    /// Stray slip characters a failure left on screen; a resumed task
    /// erases them first.
    uncorrected: usize,
    /// Bumped on every start and stop; a worker exits when it changes.
    generation: u64,
    last_error: Option<String>,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `dur` unless generation `gen` is stopped first.
    ///
    /// Returns `true` if the task was stopped.
    fn sleep(&self, gen: u64, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        let mut guard = self.lock();
        loop {
            if guard.generation != gen {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Owns the typing task and its worker thread.
///
/// Every method is blocking but short; `stop` and `set_text` wait for the
/// worker to finish its current character.
pub struct TypingEngine {
    shared: Arc<Shared>,
    injector: Arc<dyn InputInjector>,
    config: TypingConfig,
    seed: Option<u64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TypingEngine {
    pub fn new(injector: Arc<dyn InputInjector>, config: TypingConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: TypingState::Idle,
                    pending: String::new(),
                    remaining: String::new(),
                    resumable: false,
                    uncorrected: 0,
                    generation: 0,
                    last_error: None,
                }),
                wake: Condvar::new(),
            }),
            injector,
            config,
            seed: None,
            worker: Mutex::new(None),
        }
    }

    /// Makes timing and slips reproducible: each task seeds its RNG from
    /// `seed` and the task's generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    /// Starts, pauses or resumes typing.
    pub fn trigger(&self) -> TriggerOutcome {
        let mut guard = self.shared.lock();
        match guard.state {
            TypingState::Active => {
                guard.state = TypingState::Paused;
                self.shared.wake.notify_all();
                info!("typing paused");
                TriggerOutcome::Paused
            }
            TypingState::Paused => {
                guard.state = TypingState::Active;
                self.shared.wake.notify_all();
                info!("typing resumed");
                TriggerOutcome::Unpaused
            }
            TypingState::Idle => {
                let resumable =
                    guard.resumable && (!guard.remaining.is_empty() || guard.uncorrected > 0);
                let (text, owed, resumed) = if resumable {
                    (std::mem::take(&mut guard.remaining), guard.uncorrected, true)
                } else if !guard.pending.is_empty() {
                    (guard.pending.clone(), 0, false)
                } else {
                    debug!("trigger ignored: no text to type");
                    return TriggerOutcome::NothingToType;
                };

                guard.remaining.clear();
                guard.resumable = false;
                guard.uncorrected = 0;
                guard.last_error = None;
                guard.generation += 1;
                guard.state = TypingState::Active;
                let gen = guard.generation;
                drop(guard);

                let chars: Vec<char> = text.chars().collect();
                let count = chars.len();
                self.spawn_worker(chars, owed, gen);

                if resumed {
                    info!("typing resumed after failure: {count} chars left");
                    TriggerOutcome::Resumed { chars: count }
                } else {
                    info!("typing started: {count} chars");
                    TriggerOutcome::Started { chars: count }
                }
            }
        }
    }

    /// Stops the current task, keeping its untyped suffix in
    /// [`remaining`](Self::remaining). Returns `false` if nothing was running.
    ///
    /// The next trigger starts the pending text from the beginning.
    pub fn stop(&self) -> bool {
        {
            let mut guard = self.shared.lock();
            if guard.state == TypingState::Idle {
                return false;
            }
            guard.generation += 1;
            guard.state = TypingState::Idle;
            self.shared.wake.notify_all();
        }
        self.join_worker();
        info!("typing stopped");
        true
    }

    /// Replaces the pending text. A running task is stopped and its progress
    /// discarded; typing the new text needs another trigger.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        let was_running = self.stop();
        let mut guard = self.shared.lock();
        guard.remaining.clear();
        guard.resumable = false;
        guard.uncorrected = 0;
        guard.last_error = None;
        guard.pending = text;
        if was_running {
            info!(
                "injection text replaced ({} chars); previous task discarded",
                guard.pending.chars().count()
            );
        } else {
            info!("injection text set ({} chars)", guard.pending.chars().count());
        }
    }

    pub fn state(&self) -> TypingState {
        self.shared.lock().state
    }

    /// Characters the last interrupted task did not type.
    pub fn remaining(&self) -> String {
        self.shared.lock().remaining.clone()
    }

    pub fn pending(&self) -> String {
        self.shared.lock().pending.clone()
    }

    /// Stray slip characters left on screen by the last failure. A resumed
    /// task erases them before typing [`remaining`](Self::remaining).
    pub fn uncorrected(&self) -> usize {
        self.shared.lock().uncorrected
    }

    /// The injector error that ended the last task, if any.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// Blocks until the engine is idle or `timeout` elapses. Returns whether
    /// it is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.lock();
        while guard.state != TypingState::Idle {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .shared
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn spawn_worker(&self, chars: Vec<char>, owed: usize, gen: u64) {
        // A finished worker may still be unwinding its last lock.
        self.join_worker();

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(gen)),
            None => StdRng::from_entropy(),
        };
        let task = TypingTask {
            shared: Arc::clone(&self.shared),
            injector: Arc::clone(&self.injector),
            config: self.config.clone(),
            rng,
            gen,
        };

        let spawned = thread::Builder::new()
            .name("typing".into())
            .spawn(move || task.run(chars, owed));

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
            }
            Err(e) => {
                error!("failed to spawn typing thread: {e}");
                let mut guard = self.shared.lock();
                if guard.generation == gen {
                    guard.state = TypingState::Idle;
                    guard.last_error = Some(e.to_string());
                }
                self.shared.wake.notify_all();
            }
        }
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("typing thread panicked");
            }
        }
    }
}

impl Drop for TypingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct TypingTask {
    shared: Arc<Shared>,
    injector: Arc<dyn InputInjector>,
    config: TypingConfig,
    rng: StdRng,
    gen: u64,
}

enum Gate {
    Go,
    Stopped,
}

/// A plan cut short by an injector failure.
struct Interrupted {
    error: InjectError,
    /// What the executed steps left on screen for this character.
    on_screen: Vec<char>,
    /// A key whose release failed.
    held: Option<HidKeyCode>,
}

impl TypingTask {
    fn run(mut self, chars: Vec<char>, owed: usize) {
        if owed > 0 {
            if let Err((left, e)) = self.erase(owed) {
                self.finish_failed(&chars, left, e);
                return;
            }
            debug!("erased {owed} stray chars before resuming");
        }

        for (idx, &c) in chars.iter().enumerate() {
            if let Gate::Stopped = self.wait_while_paused() {
                self.finish_stopped(&chars[idx..]);
                return;
            }

            let plan = plan_char(c, &self.config, &mut self.rng);
            if let Err(cut) = self.replay(&plan) {
                if let Some(key) = cut.held {
                    if let Err(e) = self.injector.key_up(key) {
                        warn!("could not release {key:?}: {e}");
                    }
                }
                let committed = cut.on_screen.first() == Some(&c);
                let stray = cut.on_screen.len() - usize::from(committed);
                let left = match self.erase(stray) {
                    Ok(()) => 0,
                    Err((left, e)) => {
                        warn!("could not erase slip: {e}");
                        left
                    }
                };
                let rest = if committed { &chars[idx + 1..] } else { &chars[idx..] };
                self.finish_failed(rest, left, cut.error);
                return;
            }

            if idx + 1 < chars.len() {
                let interval = next_interval(&self.config, &mut self.rng);
                if self.shared.sleep(self.gen, interval) {
                    self.finish_stopped(&chars[idx + 1..]);
                    return;
                }
            }
        }
        self.finish_completed(chars.len());
    }

    /// Blocks while paused. Observes stop both before and during the pause.
    fn wait_while_paused(&self) -> Gate {
        let mut guard = self.shared.lock();
        loop {
            if guard.generation != self.gen {
                return Gate::Stopped;
            }
            if guard.state != TypingState::Paused {
                return Gate::Go;
            }
            guard = self
                .shared
                .wake
                .wait_timeout(guard, self.config.pause_poll)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Replays one character's plan. Once stopped, remaining pauses are
    /// skipped but the keystrokes still run so no slip is left on screen.
    ///
    /// A tap takes effect on key down, so `on_screen` is updated before
    /// the release.
    fn replay(&mut self, plan: &[Step]) -> Result<(), Interrupted> {
        let mut on_screen = Vec::new();
        let mut stopped = false;
        for step in plan {
            match *step {
                Step::Type(c) => {
                    if let Err(error) = self.injector.type_char(c) {
                        return Err(Interrupted { error, on_screen, held: None });
                    }
                    on_screen.push(c);
                }
                Step::Tap(key) => {
                    if let Err(error) = self.injector.key_down(key) {
                        return Err(Interrupted { error, on_screen, held: None });
                    }
                    match key {
                        HidKeyCode::Backspace => {
                            on_screen.pop();
                        }
                        HidKeyCode::Enter => on_screen.push('\n'),
                        HidKeyCode::Tab => on_screen.push('\t'),
                        _ => {}
                    }
                    if let Err(error) = self.injector.key_up(key) {
                        return Err(Interrupted { error, on_screen, held: Some(key) });
                    }
                }
                Step::Pause(dur) => {
                    if !stopped {
                        stopped = self.shared.sleep(self.gen, dur);
                    }
                }
            }
        }
        Ok(())
    }

    /// Sends `count` backspaces. On failure returns how many are still owed.
    fn erase(&self, count: usize) -> Result<(), (usize, InjectError)> {
        for done in 0..count {
            self.injector
                .key_down(HidKeyCode::Backspace)
                .map_err(|e| (count - done, e))?;
            if let Err(e) = self.injector.key_up(HidKeyCode::Backspace) {
                warn!("could not release Backspace: {e}");
            }
        }
        Ok(())
    }

    fn finish_stopped(&self, rest: &[char]) {
        let mut guard = self.shared.lock();
        guard.remaining = rest.iter().collect();
        guard.resumable = false;
        debug!("typing task stopped with {} chars left", rest.len());
        self.shared.wake.notify_all();
    }

    fn finish_failed(&self, rest: &[char], uncorrected: usize, e: InjectError) {
        warn!(
            "typing aborted: {e}; {} chars left, {uncorrected} stray",
            rest.len()
        );
        let mut guard = self.shared.lock();
        guard.remaining = rest.iter().collect();
        if guard.generation == self.gen {
            guard.state = TypingState::Idle;
            guard.resumable = !rest.is_empty() || uncorrected > 0;
            guard.uncorrected = uncorrected;
            guard.last_error = Some(e.to_string());
        }
        self.shared.wake.notify_all();
    }

    fn finish_completed(&self, total: usize) {
        let mut guard = self.shared.lock();
        if guard.generation == self.gen {
            guard.state = TypingState::Idle;
            guard.remaining.clear();
            guard.resumable = false;
            info!("typing finished: {total} chars");
        }
        self.shared.wake.notify_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::injector::mock::MockInjector;

    const WAIT: Duration = Duration::from_secs(5);

    /// No pauses at all: tasks finish as fast as the mock records.
    fn instant() -> TypingConfig {
        TypingConfig {
            mistake_probability: 0.0,
            base_interval: Duration::ZERO,
            interval_variation: Duration::ZERO,
            min_interval: Duration::ZERO,
            backspace_pause: PauseRange::from_millis(0, 0),
            correction_pause: PauseRange::from_millis(0, 0),
            insertion_pause: PauseRange::from_millis(0, 0),
            pause_poll: Duration::from_millis(5),
        }
    }

    /// A steady 10 ms per character, slow enough to interrupt.
    fn paced() -> TypingConfig {
        TypingConfig {
            base_interval: Duration::from_millis(10),
            min_interval: Duration::from_millis(10),
            ..instant()
        }
    }

    fn engine(config: TypingConfig) -> (Arc<MockInjector>, TypingEngine) {
        let mock = Arc::new(MockInjector::new());
        let engine = TypingEngine::new(mock.clone(), config).with_seed(42);
        (mock, engine)
    }

    #[test]
    fn test_trigger_without_text_does_nothing() {
        let (_mock, engine) = engine(instant());
        assert_eq!(engine.trigger(), TriggerOutcome::NothingToType);
        assert_eq!(engine.state(), TypingState::Idle);
    }

    #[test]
    fn test_task_types_text_and_returns_to_idle() {
        // Arrange
        let (mock, engine) = engine(instant());
        engine.set_text("Hello,\n\tworld!");

        // Act
        let outcome = engine.trigger();

        // Assert
        assert_eq!(outcome, TriggerOutcome::Started { chars: 14 });
        assert!(engine.wait_idle(WAIT));
        assert_eq!(mock.typed_text(), "Hello,\n\tworld!");
        assert_eq!(engine.remaining(), "");
    }

    #[test]
    fn test_mistakes_are_always_corrected() {
        // Arrange: every alphanumeric character slips
        let (mock, engine) = engine(TypingConfig {
            mistake_probability: 1.0,
            ..instant()
        });
        engine.set_text("The quick brown fox jumps 42 times");

        // Act
        engine.trigger();

        // Assert
        assert!(engine.wait_idle(WAIT));
        assert_eq!(mock.typed_text(), "The quick brown fox jumps 42 times");
        assert!(mock
            .recorded()
            .contains(&crate::infrastructure::injector::mock::InjectedEvent::KeyDown(
                relay_core::HidKeyCode::Backspace
            )));
    }

    #[test]
    fn test_stop_preserves_untyped_suffix_without_duplication() {
        // Arrange
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let (mock, engine) = engine(paced());
        engine.set_text(text);
        engine.trigger();
        thread::sleep(Duration::from_millis(60));

        // Act
        let stopped = engine.stop();

        // Assert
        assert!(stopped);
        assert_eq!(engine.state(), TypingState::Idle);
        let typed = mock.typed_text();
        let remaining = engine.remaining();
        assert!(!typed.is_empty());
        assert!(!remaining.is_empty());
        assert_eq!(format!("{typed}{remaining}"), text);
    }

    #[test]
    fn test_trigger_after_stop_starts_pending_text_afresh() {
        // Arrange
        let (_mock, engine) = engine(paced());
        engine.set_text("abcdefghijklmnopqrstuvwxyz");
        engine.trigger();
        thread::sleep(Duration::from_millis(30));
        engine.stop();

        // Act
        let outcome = engine.trigger();

        // Assert
        assert_eq!(outcome, TriggerOutcome::Started { chars: 26 });
        engine.stop();
    }

    #[test]
    fn test_pause_halts_typing_until_resumed() {
        // Arrange
        let (mock, engine) = engine(paced());
        engine.set_text("abcdefghijklmnopqrstuvwxyz");
        engine.trigger();
        thread::sleep(Duration::from_millis(40));

        // Act: pause
        assert_eq!(engine.trigger(), TriggerOutcome::Paused);
        thread::sleep(Duration::from_millis(30));
        let typed_at_pause = mock.typed_text();
        thread::sleep(Duration::from_millis(80));

        // Assert: nothing typed while paused
        assert_eq!(engine.state(), TypingState::Paused);
        assert_eq!(mock.typed_text(), typed_at_pause);

        // Act: resume
        assert_eq!(engine.trigger(), TriggerOutcome::Unpaused);

        // Assert: finishes the same text exactly once
        assert!(engine.wait_idle(WAIT));
        assert_eq!(mock.typed_text(), "abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn test_stop_while_paused_returns_to_idle() {
        let (mock, engine) = engine(paced());
        engine.set_text("abcdefghijklmnopqrstuvwxyz");
        engine.trigger();
        thread::sleep(Duration::from_millis(30));
        engine.trigger();

        assert!(engine.stop());

        assert_eq!(engine.state(), TypingState::Idle);
        assert_eq!(
            format!("{}{}", mock.typed_text(), engine.remaining()),
            "abcdefghijklmnopqrstuvwxyz"
        );
    }

    #[test]
    fn test_new_text_while_active_forces_idle_and_discards_progress() {
        // Arrange
        let (mock, engine) = engine(paced());
        engine.set_text("abcdefghijklmnopqrstuvwxyz");
        engine.trigger();
        thread::sleep(Duration::from_millis(30));

        // Act
        engine.set_text("new");

        // Assert
        assert_eq!(engine.state(), TypingState::Idle);
        assert_eq!(engine.remaining(), "");
        assert_eq!(engine.pending(), "new");
        let typed_before = mock.typed_text();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(mock.typed_text(), typed_before, "no typing without a trigger");
    }

    #[test]
    fn test_injector_failure_aborts_and_resumes_from_failed_char() {
        // Arrange: third call fails
        let mock = Arc::new(MockInjector::failing_after(2));
        let engine = TypingEngine::new(mock.clone(), instant()).with_seed(1);
        engine.set_text("abcdef");

        // Act
        engine.trigger();

        // Assert
        assert!(engine.wait_idle(WAIT));
        assert_eq!(mock.typed_text(), "ab");
        assert_eq!(engine.remaining(), "cdef");
        assert!(engine.last_error().is_some());
        assert_eq!(engine.trigger(), TriggerOutcome::Resumed { chars: 4 });
        assert!(engine.wait_idle(WAIT));
    }

    fn slipping() -> TypingConfig {
        TypingConfig {
            mistake_probability: 1.0,
            ..instant()
        }
    }

    #[test]
    fn test_failure_inside_a_slip_keeps_text_accounted_for() {
        // Arrange: every character slips and the injector dies after k calls
        let text = "abcdef";
        for seed in 0..6 {
            for k in 0..30 {
                let mock = Arc::new(MockInjector::failing_after(k));
                let engine = TypingEngine::new(mock.clone(), slipping()).with_seed(seed);
                engine.set_text(text);

                // Act
                engine.trigger();

                // Assert: the screen minus owed backspaces plus the suffix is the text
                assert!(engine.wait_idle(WAIT));
                let typed: Vec<char> = mock.typed_text().chars().collect();
                let owed = engine.uncorrected();
                assert!(owed <= typed.len(), "seed={seed} fail_after={k}");
                let visible: String = typed[..typed.len() - owed].iter().collect();
                assert_eq!(
                    format!("{visible}{}", engine.remaining()),
                    text,
                    "seed={seed} fail_after={k}"
                );
            }
        }
    }

    #[test]
    fn test_resume_after_transient_failure_types_text_exactly_once() {
        // Arrange: calls k..k+width fail, later calls succeed
        let text = "abcdef";
        for width in [1, 3] {
            for seed in 0..6 {
                for k in 0..30 {
                    let mock = Arc::new(MockInjector::failing_calls(k..k + width));
                    let engine = TypingEngine::new(mock.clone(), slipping()).with_seed(seed);
                    engine.set_text(text);
                    engine.trigger();
                    assert!(engine.wait_idle(WAIT));

                    // Act: resume until nothing is left
                    for _ in 0..4 {
                        if engine.remaining().is_empty() && engine.uncorrected() == 0 {
                            break;
                        }
                        assert!(matches!(engine.trigger(), TriggerOutcome::Resumed { .. }));
                        assert!(engine.wait_idle(WAIT));
                    }

                    // Assert
                    assert_eq!(
                        mock.typed_text(),
                        text,
                        "seed={seed} fail_calls={k}..{}",
                        k + width
                    );
                    assert_eq!(engine.uncorrected(), 0);
                }
            }
        }
    }

    #[test]
    fn test_stop_when_idle_reports_nothing_stopped() {
        let (_mock, engine) = engine(instant());
        assert!(!engine.stop());
    }

    #[test]
    fn test_pause_range_sample_is_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = PauseRange::from_millis(150, 400);
        for _ in 0..100 {
            let d = range.sample(&mut rng);
            assert!(d >= range.min && d <= range.max);
        }
        assert_eq!(
            PauseRange::from_millis(5, 5).sample(&mut rng),
            Duration::from_millis(5)
        );
    }
}
