//! Connection identity and role.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one participant connection.
///
/// Assigned by the relay when the transport connects and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first UUID group is enough to tell sessions apart in logs.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

/// What a connection has declared itself to be.
///
/// Every connection starts as a `Viewer`. Sending `register` turns it into a
/// `TargetCandidate` for the rest of its life, whether or not the token was
/// valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Viewer,
    TargetCandidate,
}
