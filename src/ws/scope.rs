//! Per-connection delivery scope.
//!
//! Tracks which identity a WebSocket connection represents and which
//! session rooms it has joined, and filters bus events down to the ones
//! this connection should receive. This is how identity-targeted emits
//! and room broadcasts ride on a single broadcast channel.

use std::collections::HashSet;

use crate::domain::{IdentityId, SessionEvent, SessionId};

/// Delivery filter for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct ConnectionScope {
    /// Identity attached via `identify`, if any.
    identity: Option<IdentityId>,
    /// Session rooms joined via `join_session`.
    rooms: HashSet<SessionId>,
}

impl ConnectionScope {
    /// Creates an empty scope (unidentified, no rooms).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds this connection to an identity.
    pub fn set_identity(&mut self, identity_id: IdentityId) {
        self.identity = Some(identity_id);
    }

    /// Returns the bound identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<IdentityId> {
        self.identity
    }

    /// Adds a session room to this connection's scope.
    pub fn join_room(&mut self, session_id: SessionId) {
        self.rooms.insert(session_id);
    }

    /// Removes a session room from this connection's scope.
    pub fn leave_room(&mut self, session_id: SessionId) {
        self.rooms.remove(&session_id);
    }

    /// Returns the number of joined rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if the given event should be delivered to this
    /// connection.
    ///
    /// Identity-addressed events match on the bound identity. Room
    /// events match on joined rooms, except that a `state_update` is
    /// never echoed back to the participant that produced it.
    #[must_use]
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::MatchPending { identity_id, .. }
            | SessionEvent::SessionStart { identity_id, .. } => {
                self.identity == Some(*identity_id)
            }
            SessionEvent::StateUpdate {
                session_id, from, ..
            } => self.rooms.contains(session_id) && self.identity != Some(*from),
            SessionEvent::SessionEnded { session_id, .. } => self.rooms.contains(session_id),
        }
    }
}
