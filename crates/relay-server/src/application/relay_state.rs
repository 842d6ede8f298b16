//! The relay's slot state machine.
//!
//! [`RelayState`] owns every connection record, the single target slot and
//! the frame throttle. It performs no I/O: each operation appends
//! [`Effect`]s to a caller-supplied buffer, and the actor that owns the state
//! carries them out in order. Order matters; for example an eviction is
//! `Send(evicted)` followed by `Close`, so the old target sees the reason
//! before the socket goes away.
//!
//! # Slot lifecycle
//!
//! ```text
//! Empty ──register(valid, A)──▶ Occupied(A)
//! Occupied(A) ──register(valid, B)──▶ Occupied(B)   (A evicted first)
//! Occupied(A) ──disconnect(A)──▶ Empty
//! Occupied(A) ──disconnect(other)──▶ Occupied(A)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use relay_core::{
    ConnectionId, ControlCommand, FrameThrottle, RelayMsg, Role, ThrottleDecision,
};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::domain::RelayConfig;

pub(crate) const MSG_AUTH_FAILED: &str = "Authentication failed. Invalid secret.";
pub(crate) const MSG_REGISTRATION_FAILED: &str = "Authentication failed. Invalid token.";
pub(crate) const MSG_EVICTED: &str = "Another target registered and replaced this one.";
pub(crate) const MSG_TARGET_CONNECTED: &str = "Target connected to relay.";
pub(crate) const MSG_TARGET_DISCONNECTED: &str = "Target disconnected from relay.";
pub(crate) const MSG_NOT_AUTHENTICATED: &str = "Not authenticated to send commands.";
pub(crate) const MSG_NO_TARGET: &str = "Target not connected. Cannot send command.";
pub(crate) const MSG_NO_TARGET_INJECTION: &str = "Target not connected. Text not delivered.";

/// One side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Queue a control message for one connection.
    Send(ConnectionId, RelayMsg),
    /// Hand the same frame to every listed connection.
    Frame {
        recipients: Vec<ConnectionId>,
        frame: Arc<[u8]>,
    },
    /// Flush queued messages to the connection, then close it.
    Close(ConnectionId),
}

/// Result of [`RelayState::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected,
    /// Rejected, and the attempt limit was reached so the connection is closing.
    LockedOut,
}

/// Result of [`RelayState::register_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The registrant now occupies the slot; `evicted` is the previous occupant.
    Admitted { evicted: Option<ConnectionId> },
    Rejected,
}

/// Result of [`RelayState::broadcast_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Broadcast { recipients: usize },
    Throttled,
    NotOccupant,
    Empty,
}

/// Result of [`RelayState::route_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Routed,
    NoTarget,
    Unauthorized,
}

/// Result of [`RelayState::set_injection_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    Delivered,
    NoTarget,
    Unauthorized,
}

#[derive(Debug, Default)]
struct ConnectionRecord {
    role: Role,
    authenticated: bool,
    failed_auth_attempts: u32,
}

impl ConnectionRecord {
    fn is_authorized_viewer(&self) -> bool {
        self.role == Role::Viewer && self.authenticated
    }
}

/// Relay bookkeeping: connections, the target slot and the frame throttle.
pub struct RelayState {
    target_secret: String,
    viewer_secret: String,
    max_auth_attempts: u32,
    connections: HashMap<ConnectionId, ConnectionRecord>,
    slot: Option<ConnectionId>,
    throttle: FrameThrottle,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            target_secret: config.target_secret.clone(),
            viewer_secret: config.viewer_secret.clone(),
            max_auth_attempts: config.max_auth_attempts,
            connections: HashMap::new(),
            slot: None,
            throttle: FrameThrottle::new(config.min_frame_interval()),
        }
    }

    /// Records a freshly connected transport. Every connection starts as an
    /// unauthenticated viewer.
    pub fn connect(&mut self, id: ConnectionId) {
        self.connections.insert(id, ConnectionRecord::default());
        debug!("connection {id} opened ({} total)", self.connections.len());
    }

    /// Checks a viewer secret.
    pub fn authenticate(
        &mut self,
        id: ConnectionId,
        secret: &str,
        out: &mut Vec<Effect>,
    ) -> AuthOutcome {
        let max_attempts = self.max_auth_attempts;
        let matches = secrets_match(secret, &self.viewer_secret);
        let Some(record) = self.connections.get_mut(&id) else {
            return AuthOutcome::Rejected;
        };

        if matches {
            record.authenticated = true;
            record.failed_auth_attempts = 0;
            info!("connection {id} authenticated as viewer");
            out.push(Effect::Send(id, RelayMsg::Authenticated));
            return AuthOutcome::Authenticated;
        }

        record.failed_auth_attempts += 1;
        warn!(
            "connection {id} failed authentication ({}/{max_attempts})",
            record.failed_auth_attempts
        );
        out.push(Effect::Send(
            id,
            RelayMsg::AuthFailed {
                message: MSG_AUTH_FAILED.to_string(),
            },
        ));

        if record.failed_auth_attempts >= max_attempts {
            warn!("connection {id} reached the authentication limit; closing");
            out.push(Effect::Close(id));
            return AuthOutcome::LockedOut;
        }
        AuthOutcome::Rejected
    }

    /// Handles a target's `register` request.
    ///
    /// A valid token always wins the slot. The previous occupant, if any and
    /// if different from the registrant, is told it was evicted, closed, and
    /// removed exactly as if it had disconnected.
    pub fn register_target(
        &mut self,
        id: ConnectionId,
        token: &str,
        out: &mut Vec<Effect>,
    ) -> RegisterOutcome {
        let valid = secrets_match(token, &self.target_secret);
        let Some(record) = self.connections.get_mut(&id) else {
            return RegisterOutcome::Rejected;
        };
        record.role = Role::TargetCandidate;

        if !valid {
            warn!("connection {id} sent an invalid target token");
            out.push(Effect::Send(
                id,
                RelayMsg::RegistrationFail {
                    message: MSG_REGISTRATION_FAILED.to_string(),
                },
            ));
            out.push(Effect::Close(id));
            return RegisterOutcome::Rejected;
        }

        let evicted = match self.slot {
            Some(prev) if prev != id => {
                warn!("target {id} replacing target {prev}; evicting {prev}");
                out.push(Effect::Send(
                    prev,
                    RelayMsg::Evicted {
                        message: MSG_EVICTED.to_string(),
                    },
                ));
                out.push(Effect::Close(prev));
                self.drop_connection(prev, Some(id), out);
                Some(prev)
            }
            Some(_) => {
                info!("target {id} re-registered");
                None
            }
            None => {
                info!("target {id} registered");
                None
            }
        };

        self.slot = Some(id);
        self.throttle.reset();
        self.notify_others(
            id,
            RelayMsg::TargetConnected {
                message: MSG_TARGET_CONNECTED.to_string(),
            },
            out,
        );
        out.push(Effect::Send(id, RelayMsg::RegistrationSuccess));
        RegisterOutcome::Admitted { evicted }
    }

    /// Removes a connection whose transport went away.
    pub fn disconnect(&mut self, id: ConnectionId, out: &mut Vec<Effect>) {
        if !self.connections.contains_key(&id) {
            // Already removed by an eviction or a forced close.
            return;
        }
        self.drop_connection(id, None, out);
    }

    /// Offers a frame from `from` for broadcast at time `now`.
    ///
    /// Only the occupant may broadcast. Frames are delivered to authenticated
    /// viewers; a frame arriving inside the throttle interval is dropped.
    pub fn broadcast_frame(
        &mut self,
        from: ConnectionId,
        frame: Vec<u8>,
        now: Instant,
        out: &mut Vec<Effect>,
    ) -> FrameOutcome {
        if self.slot != Some(from) {
            warn!("dropping frame from {from}: not the registered target");
            return FrameOutcome::NotOccupant;
        }
        if frame.is_empty() {
            warn!("dropping empty frame from target {from}");
            return FrameOutcome::Empty;
        }
        if self.throttle.admit(now) == ThrottleDecision::Drop {
            debug!(
                "throttled frame from {from} ({} dropped so far)",
                self.throttle.dropped_count()
            );
            return FrameOutcome::Throttled;
        }

        let recipients: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(cid, rec)| **cid != from && rec.is_authorized_viewer())
            .map(|(cid, _)| *cid)
            .collect();
        let count = recipients.len();
        debug!(
            "broadcasting {} byte frame to {count} viewer(s) ({} sent so far)",
            frame.len(),
            self.throttle.broadcast_count()
        );
        if count > 0 {
            out.push(Effect::Frame {
                recipients,
                frame: Arc::from(frame),
            });
        }
        FrameOutcome::Broadcast { recipients: count }
    }

    /// Forwards a viewer command to the occupant.
    pub fn route_command(
        &mut self,
        from: ConnectionId,
        command: ControlCommand,
        out: &mut Vec<Effect>,
    ) -> RouteOutcome {
        if !self.is_authorized_viewer(from) {
            warn!("command from {from} rejected: not an authenticated viewer");
            out.push(Effect::Send(
                from,
                RelayMsg::CommandError {
                    message: MSG_NOT_AUTHENTICATED.to_string(),
                },
            ));
            return RouteOutcome::Unauthorized;
        }
        let Some(target) = self.slot else {
            warn!("command from {from} rejected: no target connected");
            out.push(Effect::Send(
                from,
                RelayMsg::CommandError {
                    message: MSG_NO_TARGET.to_string(),
                },
            ));
            return RouteOutcome::NoTarget;
        };

        debug!("routing {} from {from} to target {target}", command.action());
        out.push(Effect::Send(target, RelayMsg::Command { command }));
        RouteOutcome::Routed
    }

    /// Forwards injection text to the occupant and acknowledges the requester.
    pub fn set_injection_text(
        &mut self,
        from: ConnectionId,
        text: String,
        out: &mut Vec<Effect>,
    ) -> InjectionOutcome {
        if !self.is_authorized_viewer(from) {
            warn!("injection text from {from} rejected: not an authenticated viewer");
            out.push(Effect::Send(from, RelayMsg::ack_error(MSG_NOT_AUTHENTICATED)));
            return InjectionOutcome::Unauthorized;
        }
        let Some(target) = self.slot else {
            warn!("injection text from {from} rejected: no target connected");
            out.push(Effect::Send(from, RelayMsg::ack_error(MSG_NO_TARGET_INJECTION)));
            return InjectionOutcome::NoTarget;
        };

        info!(
            "forwarding {} chars of injection text from {from} to target {target}",
            text.chars().count()
        );
        out.push(Effect::Send(target, RelayMsg::ReceiveInjectionText { text }));
        out.push(Effect::Send(from, RelayMsg::ack_success()));
        InjectionOutcome::Delivered
    }

    /// Current occupant of the target slot.
    pub fn occupant(&self) -> Option<ConnectionId> {
        self.slot
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Frames broadcast and frames dropped by the throttle so far.
    pub fn frame_counts(&self) -> (u64, u64) {
        (self.throttle.broadcast_count(), self.throttle.dropped_count())
    }

    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(|r| r.authenticated)
            .unwrap_or(false)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn is_authorized_viewer(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(ConnectionRecord::is_authorized_viewer)
            .unwrap_or(false)
    }

    /// Forgets `id`; if it held the slot, empties the slot and tells everyone
    /// left, except `skip`.
    fn drop_connection(
        &mut self,
        id: ConnectionId,
        skip: Option<ConnectionId>,
        out: &mut Vec<Effect>,
    ) {
        self.connections.remove(&id);
        debug!("connection {id} removed ({} remaining)", self.connections.len());

        if self.slot == Some(id) {
            self.slot = None;
            info!("target {id} left the slot");
            let msg = RelayMsg::TargetDisconnected {
                message: MSG_TARGET_DISCONNECTED.to_string(),
            };
            for cid in self.connections.keys() {
                if Some(*cid) != skip {
                    out.push(Effect::Send(*cid, msg.clone()));
                }
            }
        }
    }

    fn notify_others(&self, except: ConnectionId, msg: RelayMsg, out: &mut Vec<Effect>) {
        for cid in self.connections.keys() {
            if *cid != except {
                out.push(Effect::Send(*cid, msg.clone()));
            }
        }
    }
}

/// Compares two secrets in time independent of where they first differ.
fn secrets_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use relay_core::{AckStatus, MouseButton};

    use super::*;

    const TOKEN: &str = "target-token";
    const SECRET: &str = "viewer-secret";

    fn state() -> RelayState {
        RelayState::new(&RelayConfig {
            target_secret: TOKEN.to_string(),
            viewer_secret: SECRET.to_string(),
            target_fps: 10,
            ..RelayConfig::default()
        })
    }

    fn connected(state: &mut RelayState) -> ConnectionId {
        let id = ConnectionId::new();
        state.connect(id);
        id
    }

    fn viewer(state: &mut RelayState) -> ConnectionId {
        let id = connected(state);
        state.authenticate(id, SECRET, &mut Vec::new());
        id
    }

    fn target(state: &mut RelayState) -> ConnectionId {
        let id = connected(state);
        state.register_target(id, TOKEN, &mut Vec::new());
        id
    }

    fn sent_to(effects: &[Effect], id: ConnectionId) -> Vec<&RelayMsg> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(to, msg) if *to == id => Some(msg),
                _ => None,
            })
            .collect()
    }

    fn click() -> ControlCommand {
        ControlCommand::Click {
            button: MouseButton::Left,
            x: 100,
            y: 50,
        }
    }

    // ── Authenticate ─────────────────────────────────────────────────────────

    #[test]
    fn test_authenticate_with_valid_secret_marks_connection() {
        // Arrange
        let mut s = state();
        let id = connected(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.authenticate(id, SECRET, &mut out);

        // Assert
        assert_eq!(outcome, AuthOutcome::Authenticated);
        assert!(s.is_authenticated(id));
        assert_eq!(out, vec![Effect::Send(id, RelayMsg::Authenticated)]);
    }

    #[test]
    fn test_authenticate_with_wrong_secret_is_explicitly_rejected() {
        // Arrange
        let mut s = state();
        let id = connected(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.authenticate(id, "nope", &mut out);

        // Assert
        assert_eq!(outcome, AuthOutcome::Rejected);
        assert!(!s.is_authenticated(id));
        assert!(matches!(
            sent_to(&out, id).as_slice(),
            [RelayMsg::AuthFailed { .. }]
        ));
    }

    #[test]
    fn test_third_failed_authentication_closes_connection() {
        // Arrange
        let mut s = state();
        let id = connected(&mut s);
        s.authenticate(id, "a", &mut Vec::new());
        s.authenticate(id, "b", &mut Vec::new());
        let mut out = Vec::new();

        // Act
        let outcome = s.authenticate(id, "c", &mut out);

        // Assert
        assert_eq!(outcome, AuthOutcome::LockedOut);
        assert_eq!(out.last(), Some(&Effect::Close(id)));
    }

    #[test]
    fn test_target_token_is_not_a_viewer_secret() {
        let mut s = state();
        let id = connected(&mut s);
        assert_eq!(
            s.authenticate(id, TOKEN, &mut Vec::new()),
            AuthOutcome::Rejected
        );
    }

    // ── RegisterTarget ───────────────────────────────────────────────────────

    #[test]
    fn test_register_into_empty_slot_notifies_others_and_registrant() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let t = connected(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.register_target(t, TOKEN, &mut out);

        // Assert
        assert_eq!(outcome, RegisterOutcome::Admitted { evicted: None });
        assert_eq!(s.occupant(), Some(t));
        assert!(matches!(
            sent_to(&out, v).as_slice(),
            [RelayMsg::TargetConnected { .. }]
        ));
        assert_eq!(sent_to(&out, t), vec![&RelayMsg::RegistrationSuccess]);
    }

    #[test]
    fn test_register_with_invalid_token_leaves_slot_untouched() {
        // Arrange
        let mut s = state();
        let existing = target(&mut s);
        let intruder = connected(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.register_target(intruder, "wrong", &mut out);

        // Assert
        assert_eq!(outcome, RegisterOutcome::Rejected);
        assert_eq!(s.occupant(), Some(existing));
        assert!(matches!(
            out.as_slice(),
            [
                Effect::Send(_, RelayMsg::RegistrationFail { .. }),
                Effect::Close(c)
            ] if *c == intruder
        ));
    }

    #[test]
    fn test_second_target_evicts_first_in_order() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let a = target(&mut s);
        let b = connected(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.register_target(b, TOKEN, &mut out);

        // Assert: evicted + close for A come before anything else
        assert_eq!(outcome, RegisterOutcome::Admitted { evicted: Some(a) });
        assert_eq!(s.occupant(), Some(b));
        assert!(matches!(&out[0], Effect::Send(to, RelayMsg::Evicted { .. }) if *to == a));
        assert_eq!(out[1], Effect::Close(a));

        // The viewer sees the old target leave, then the new one arrive.
        let viewer_msgs = sent_to(&out, v);
        assert!(matches!(
            viewer_msgs.as_slice(),
            [
                RelayMsg::TargetDisconnected { .. },
                RelayMsg::TargetConnected { .. }
            ]
        ));

        // The new target is not told about the old one leaving.
        assert_eq!(sent_to(&out, b), vec![&RelayMsg::RegistrationSuccess]);
        assert_eq!(s.connection_count(), 2);
    }

    #[test]
    fn test_evicted_target_later_disconnect_is_a_no_op() {
        // Arrange
        let mut s = state();
        let a = target(&mut s);
        let b = target(&mut s);
        let mut out = Vec::new();

        // Act
        s.disconnect(a, &mut out);

        // Assert
        assert!(out.is_empty());
        assert_eq!(s.occupant(), Some(b));
    }

    #[test]
    fn test_reregistration_by_occupant_does_not_evict() {
        // Arrange
        let mut s = state();
        let a = target(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.register_target(a, TOKEN, &mut out);

        // Assert
        assert_eq!(outcome, RegisterOutcome::Admitted { evicted: None });
        assert!(!out.contains(&Effect::Close(a)));
        assert_eq!(s.occupant(), Some(a));
    }

    #[test]
    fn test_slot_never_holds_more_than_one_occupant() {
        // Arrange
        let mut s = state();
        let ids: Vec<_> = (0..5).map(|_| connected(&mut s)).collect();

        // Act
        for id in &ids {
            s.register_target(*id, TOKEN, &mut Vec::new());
        }

        // Assert: only the last registrant remains; the others were removed
        assert_eq!(s.occupant(), ids.last().copied());
        assert_eq!(s.connection_count(), 1);
    }

    // ── Disconnect ───────────────────────────────────────────────────────────

    #[test]
    fn test_occupant_disconnect_empties_slot_and_notifies_all() {
        // Arrange
        let mut s = state();
        let v1 = viewer(&mut s);
        let v2 = connected(&mut s);
        let t = target(&mut s);
        let mut out = Vec::new();

        // Act
        s.disconnect(t, &mut out);

        // Assert
        assert_eq!(s.occupant(), None);
        for v in [v1, v2] {
            assert!(matches!(
                sent_to(&out, v).as_slice(),
                [RelayMsg::TargetDisconnected { .. }]
            ));
        }
    }

    #[test]
    fn test_viewer_disconnect_is_bookkeeping_only() {
        // Arrange
        let mut s = state();
        let t = target(&mut s);
        let v = viewer(&mut s);
        let mut out = Vec::new();

        // Act
        s.disconnect(v, &mut out);

        // Assert
        assert!(out.is_empty());
        assert_eq!(s.occupant(), Some(t));
        assert_eq!(s.connection_count(), 1);
    }

    // ── BroadcastFrame ───────────────────────────────────────────────────────

    #[test]
    fn test_frame_goes_to_authenticated_viewers_only() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let _anon = connected(&mut s);
        let t = target(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.broadcast_frame(t, vec![0xFF, 0xD8], Instant::now(), &mut out);

        // Assert
        assert_eq!(outcome, FrameOutcome::Broadcast { recipients: 1 });
        match &out[..] {
            [Effect::Frame { recipients, frame }] => {
                assert_eq!(recipients, &vec![v]);
                assert_eq!(&frame[..], &[0xFF, 0xD8]);
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn test_frame_from_non_occupant_is_dropped() {
        let mut s = state();
        let _v = viewer(&mut s);
        let _t = target(&mut s);
        let stranger = connected(&mut s);
        let mut out = Vec::new();
        assert_eq!(
            s.broadcast_frame(stranger, vec![1], Instant::now(), &mut out),
            FrameOutcome::NotOccupant
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_frame_is_dropped() {
        let mut s = state();
        let t = target(&mut s);
        assert_eq!(
            s.broadcast_frame(t, Vec::new(), Instant::now(), &mut Vec::new()),
            FrameOutcome::Empty
        );
    }

    #[test]
    fn test_frame_inside_interval_is_throttled_not_queued() {
        // Arrange
        let mut s = state();
        let _v = viewer(&mut s);
        let t = target(&mut s);
        let t0 = Instant::now();
        s.broadcast_frame(t, vec![1], t0, &mut Vec::new());
        let mut out = Vec::new();

        // Act
        let outcome = s.broadcast_frame(t, vec![2], t0 + Duration::from_millis(50), &mut out);
        let later = s.broadcast_frame(t, vec![3], t0 + Duration::from_millis(100), &mut out);

        // Assert: the dropped frame never reappears
        assert_eq!(outcome, FrameOutcome::Throttled);
        assert_eq!(later, FrameOutcome::Broadcast { recipients: 1 });
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Effect::Frame { frame, .. } if frame[..] == [3]));
    }

    #[test]
    fn test_new_occupant_first_frame_is_not_throttled() {
        // Arrange
        let mut s = state();
        let _v = viewer(&mut s);
        let a = target(&mut s);
        let t0 = Instant::now();
        s.broadcast_frame(a, vec![1], t0, &mut Vec::new());
        let b = target(&mut s);

        // Act
        let outcome = s.broadcast_frame(b, vec![2], t0 + Duration::from_millis(1), &mut Vec::new());

        // Assert
        assert_eq!(outcome, FrameOutcome::Broadcast { recipients: 1 });
    }

    // ── RouteCommand ─────────────────────────────────────────────────────────

    #[test]
    fn test_command_is_routed_verbatim_to_occupant_only() {
        // Arrange
        let mut s = state();
        let v1 = viewer(&mut s);
        let v2 = viewer(&mut s);
        let t = target(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.route_command(v1, click(), &mut out);

        // Assert
        assert_eq!(outcome, RouteOutcome::Routed);
        assert_eq!(
            out,
            vec![Effect::Send(t, RelayMsg::Command { command: click() })]
        );
        assert!(sent_to(&out, v2).is_empty());
    }

    #[test]
    fn test_unauthenticated_commands_never_reach_target() {
        // Arrange
        let mut s = state();
        let t = target(&mut s);
        let anon = connected(&mut s);
        let commands = [
            ControlCommand::Move { x: 1, y: 1 },
            click(),
            ControlCommand::Scroll { dx: 0, dy: 1 },
            ControlCommand::KeyDown {
                key: "a".into(),
                code: "KeyA".into(),
                modifiers: Default::default(),
            },
            ControlCommand::KeyUp {
                key: "a".into(),
                code: "KeyA".into(),
            },
        ];

        for command in commands {
            let mut out = Vec::new();

            // Act
            let outcome = s.route_command(anon, command, &mut out);

            // Assert
            assert_eq!(outcome, RouteOutcome::Unauthorized);
            assert!(sent_to(&out, t).is_empty());
            assert!(matches!(
                sent_to(&out, anon).as_slice(),
                [RelayMsg::CommandError { message }] if message == MSG_NOT_AUTHENTICATED
            ));
        }
    }

    #[test]
    fn test_command_from_target_is_unauthorized() {
        let mut s = state();
        let t = target(&mut s);
        assert_eq!(
            s.route_command(t, click(), &mut Vec::new()),
            RouteOutcome::Unauthorized
        );
    }

    #[test]
    fn test_command_with_empty_slot_reports_no_target() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.route_command(v, click(), &mut out);

        // Assert
        assert_eq!(outcome, RouteOutcome::NoTarget);
        assert!(matches!(
            sent_to(&out, v).as_slice(),
            [RelayMsg::CommandError { message }] if message == MSG_NO_TARGET
        ));
    }

    #[test]
    fn test_no_ghost_routing_after_target_leaves() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let t = target(&mut s);
        s.disconnect(t, &mut Vec::new());
        let mut out = Vec::new();

        // Act
        let outcome = s.route_command(v, click(), &mut out);

        // Assert
        assert_eq!(outcome, RouteOutcome::NoTarget);
        assert!(sent_to(&out, t).is_empty());
    }

    // ── SetInjectionText ─────────────────────────────────────────────────────

    #[test]
    fn test_injection_text_is_forwarded_and_acked() {
        // Arrange
        let mut s = state();
        let v = viewer(&mut s);
        let t = target(&mut s);
        let mut out = Vec::new();

        // Act
        let outcome = s.set_injection_text(v, "hello".to_string(), &mut out);

        // Assert
        assert_eq!(outcome, InjectionOutcome::Delivered);
        assert_eq!(
            sent_to(&out, t),
            vec![&RelayMsg::ReceiveInjectionText {
                text: "hello".to_string()
            }]
        );
        assert!(matches!(
            sent_to(&out, v).as_slice(),
            [RelayMsg::TextInjectionAck { status: AckStatus::Success, message: None }]
        ));
    }

    #[test]
    fn test_injection_without_target_acks_error() {
        let mut s = state();
        let v = viewer(&mut s);
        let mut out = Vec::new();
        assert_eq!(
            s.set_injection_text(v, "x".to_string(), &mut out),
            InjectionOutcome::NoTarget
        );
        assert!(matches!(
            sent_to(&out, v).as_slice(),
            [RelayMsg::TextInjectionAck { status: AckStatus::Error, message: Some(_) }]
        ));
    }

    #[test]
    fn test_injection_from_unauthenticated_connection_has_no_side_effects() {
        let mut s = state();
        let t = target(&mut s);
        let anon = connected(&mut s);
        let mut out = Vec::new();
        assert_eq!(
            s.set_injection_text(anon, "x".to_string(), &mut out),
            InjectionOutcome::Unauthorized
        );
        assert!(sent_to(&out, t).is_empty());
    }

    #[test]
    fn test_secrets_match_requires_exact_equality() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("abc", "abcd"));
        assert!(!secrets_match("", "abc"));
    }
}
