//! Local operator input: the typing toggle and stop controls.
//!
//! Sources run on their own OS threads and feed [`LocalAction`]s into a
//! channel the agent loop reads. They are independent of relay commands, so
//! a viewer can never start or stop typing on its own.

pub mod console;

#[cfg(target_os = "windows")]
pub mod hotkey;

/// An operator request for the typing engine or the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    /// Start, pause or resume typing.
    Toggle,
    /// Stop typing, keeping the untyped remainder.
    Stop,
    /// Shut the agent down.
    Quit,
}
