//! JSON codec for relay control messages.
//!
//! Control messages are UTF-8 JSON carried in WebSocket text frames. The
//! codec enforces a size ceiling before parsing so that a single oversized
//! injection request cannot make the relay buffer arbitrary amounts of text.

use serde::Serialize;
use thiserror::Error;

use crate::protocol::messages::{ClientMsg, RelayMsg};

/// Largest accepted control message, in bytes.
pub const MAX_CONTROL_MESSAGE_LEN: usize = 1024 * 1024;

/// Errors that can occur while encoding or decoding control messages.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The text frame exceeds [`MAX_CONTROL_MESSAGE_LEN`].
    #[error("control message too large: {len} bytes (limit {limit})")]
    TooLarge { len: usize, limit: usize },

    /// The text is not valid JSON or does not match any known message.
    #[error("malformed control message: {0}")]
    Malformed(String),
}

/// Serializes any protocol message to its JSON text form.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if serialization fails, which can only
/// happen for non-string map keys and is therefore unreachable for the
/// message types in this crate.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Parses a text frame received by the relay.
///
/// # Errors
///
/// Returns [`ProtocolError::TooLarge`] or [`ProtocolError::Malformed`].
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    check_len(text)?;
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Parses a text frame received from the relay.
///
/// # Errors
///
/// Returns [`ProtocolError::TooLarge`] or [`ProtocolError::Malformed`].
pub fn decode_relay_msg(text: &str) -> Result<RelayMsg, ProtocolError> {
    check_len(text)?;
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

fn check_len(text: &str) -> Result<(), ProtocolError> {
    if text.len() > MAX_CONTROL_MESSAGE_LEN {
        return Err(ProtocolError::TooLarge {
            len: text.len(),
            limit: MAX_CONTROL_MESSAGE_LEN,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
