//! JSON message types for the relay control protocol.
//!
//! Every participant (target or viewer) holds one WebSocket connection to the
//! relay. Control traffic travels as JSON text frames; screen frames travel as
//! binary frames and are never represented here.
//!
//! # Message flow
//!
//! ```text
//! Target → Relay:  register, (binary frame)
//! Viewer → Relay:  authenticate, command, set_injection_text
//! Relay  → Target: registration_success/fail, evicted, command, receive_injection_text
//! Relay  → Viewer: authenticated/auth_failed, target_connected/disconnected,
//!                  command_error, text_injection_ack, (binary frame)
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object whose `"type"` field names the variant in
//! `snake_case`:
//!
//! ```json
//! {"type":"register","token":"s3cret"}
//! {"type":"command","command":{"action":"click","button":"left","x":100,"y":50}}
//! ```

use serde::{Deserialize, Serialize};

// ── Participant → Relay ───────────────────────────────────────────────────────

/// Messages a participant sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// A viewer presents the shared viewer secret.
    Authenticate { secret: String },

    /// A target asks to occupy the slot.
    Register { token: String },

    /// A viewer sends a pointer or keyboard command for the current target.
    Command { command: ControlCommand },

    /// A viewer pushes text for the target's typing engine.
    SetInjectionText { text: String },
}

// ── Relay → Participant ───────────────────────────────────────────────────────

/// Messages the relay sends to participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMsg {
    /// The viewer secret was accepted.
    Authenticated,

    /// The viewer secret was rejected.
    AuthFailed { message: String },

    /// The target now occupies the slot.
    RegistrationSuccess,

    /// The target token was rejected; the relay closes the connection next.
    RegistrationFail { message: String },

    /// Sent to the previous occupant right before it is disconnected because
    /// another target registered.
    Evicted { message: String },

    /// A target took the slot.
    TargetConnected { message: String },

    /// The occupying target went away; the slot is empty.
    TargetDisconnected { message: String },

    /// A command could not be routed.
    CommandError { message: String },

    /// Outcome of a `set_injection_text` request.
    TextInjectionAck {
        status: AckStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A command forwarded verbatim to the target.
    Command { command: ControlCommand },

    /// Injection text forwarded to the target.
    ReceiveInjectionText { text: String },
}

impl RelayMsg {
    /// Short variant name for log lines. Never includes field values.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayMsg::Authenticated => "authenticated",
            RelayMsg::AuthFailed { .. } => "auth_failed",
            RelayMsg::RegistrationSuccess => "registration_success",
            RelayMsg::RegistrationFail { .. } => "registration_fail",
            RelayMsg::Evicted { .. } => "evicted",
            RelayMsg::TargetConnected { .. } => "target_connected",
            RelayMsg::TargetDisconnected { .. } => "target_disconnected",
            RelayMsg::CommandError { .. } => "command_error",
            RelayMsg::TextInjectionAck { .. } => "text_injection_ack",
            RelayMsg::Command { .. } => "command",
            RelayMsg::ReceiveInjectionText { .. } => "receive_injection_text",
        }
    }

    /// Builds a successful injection acknowledgement.
    pub fn ack_success() -> Self {
        RelayMsg::TextInjectionAck {
            status: AckStatus::Success,
            message: None,
        }
    }

    /// Builds a failed injection acknowledgement carrying `reason`.
    pub fn ack_error(reason: impl Into<String>) -> Self {
        RelayMsg::TextInjectionAck {
            status: AckStatus::Error,
            message: Some(reason.into()),
        }
    }
}

impl ClientMsg {
    /// Short variant name for log lines.
    ///
    /// Secrets, tokens and injection text must never reach the log, so callers
    /// log this instead of the `Debug` representation.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::Authenticate { .. } => "authenticate",
            ClientMsg::Register { .. } => "register",
            ClientMsg::Command { .. } => "command",
            ClientMsg::SetInjectionText { .. } => "set_injection_text",
        }
    }
}

/// Result field of [`RelayMsg::TextInjectionAck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

// ── Control commands ──────────────────────────────────────────────────────────

/// A pointer or keyboard command, forwarded to the target without
/// interpretation by the relay.
///
/// Coordinates are pixels in the captured frame. The target adds its monitor
/// origin before injecting.
///
/// ```json
/// {"action":"move","x":10,"y":20}
/// {"action":"keydown","key":"a","code":"KeyA","ctrlKey":false,"shiftKey":true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlCommand {
    Move {
        x: i32,
        y: i32,
    },
    Click {
        #[serde(default)]
        button: MouseButton,
        x: i32,
        y: i32,
    },
    /// One unit per wheel notch. `dy > 0` scrolls down, `dx > 0` scrolls right.
    Scroll {
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dy: i32,
    },
    KeyDown {
        /// Browser `KeyboardEvent.key` value.
        key: String,
        /// Browser `KeyboardEvent.code` value; may be empty for synthetic events.
        #[serde(default)]
        code: String,
        #[serde(flatten)]
        modifiers: Modifiers,
    },
    KeyUp {
        key: String,
        #[serde(default)]
        code: String,
    },
}

impl ControlCommand {
    /// Short action name for log lines.
    pub fn action(&self) -> &'static str {
        match self {
            ControlCommand::Move { .. } => "move",
            ControlCommand::Click { .. } => "click",
            ControlCommand::Scroll { .. } => "scroll",
            ControlCommand::KeyDown { .. } => "keydown",
            ControlCommand::KeyUp { .. } => "keyup",
        }
    }
}

/// Mouse button named by a click command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier state reported alongside a key-down, using the browser's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(rename = "ctrlKey", default)]
    pub ctrl: bool,
    #[serde(rename = "shiftKey", default)]
    pub shift: bool,
    #[serde(rename = "altKey", default)]
    pub alt: bool,
    #[serde(rename = "metaKey", default)]
    pub meta: bool,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
