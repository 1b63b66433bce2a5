//! Session aggregate: participants, roles, phase, and shared state.
//!
//! A [`Session`] is the paired two-party unit. Roles are fixed at
//! creation (first participant → [`Role::A`], second → [`Role::B`]) and
//! never recomputed from position in a collection.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IdentityId;

/// Unique identifier for a session, also used as the broadcast room name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `SessionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed role designation assigned to each participant at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// First participant (earlier enqueue).
    A,
    /// Second participant.
    B,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created; not all participants have attached a connection yet.
    Matched,
    /// Both participants currently connected.
    Active,
    /// One side dropped; session preserved for resume.
    Disconnected,
    /// Both participants left. No further events accepted.
    Ended,
}

/// One seat in a session: the identity bound to it plus attach/leave
/// bookkeeping. The seat's role never changes after creation.
#[derive(Debug, Clone)]
pub struct Seat {
    /// Identity occupying this seat (immutable after creation).
    pub identity_id: IdentityId,
    /// Whether this participant currently has a connection attached.
    pub attached: bool,
    /// Whether this participant has explicitly left the session.
    pub left: bool,
}

impl Seat {
    fn new(identity_id: IdentityId) -> Self {
        Self {
            identity_id,
            attached: false,
            left: false,
        }
    }
}

/// The two-party session aggregate.
///
/// `state_snapshot` is opaque to the coordinator: it is stored verbatim
/// and forwarded without interpretation. Move legality lives entirely in
/// the connected clients' game engine.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier (immutable, doubles as the room name).
    pub session_id: SessionId,
    /// Seat for the first participant (role A).
    pub seat_a: Seat,
    /// Seat for the second participant (role B).
    pub seat_b: Seat,
    /// Opaque serialized shared state, replaced wholesale on update.
    pub state_snapshot: String,
    /// Set once both participants have attached at least once.
    pub ready: bool,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last state mutation.
    pub last_modified_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session in the `Matched` phase with an empty
    /// snapshot. The first argument becomes role A.
    #[must_use]
    pub fn new(participant_a: IdentityId, participant_b: IdentityId) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            seat_a: Seat::new(participant_a),
            seat_b: Seat::new(participant_b),
            state_snapshot: String::new(),
            ready: false,
            phase: SessionPhase::Matched,
            created_at: now,
            last_modified_at: now,
        }
    }

    /// Returns the fixed role of the given participant, if it is one.
    #[must_use]
    pub fn role_of(&self, identity_id: IdentityId) -> Option<Role> {
        if self.seat_a.identity_id == identity_id {
            Some(Role::A)
        } else if self.seat_b.identity_id == identity_id {
            Some(Role::B)
        } else {
            None
        }
    }

    /// Returns the other participant's identity, if the given identity
    /// is a participant.
    #[must_use]
    pub fn other_participant(&self, identity_id: IdentityId) -> Option<IdentityId> {
        match self.role_of(identity_id)? {
            Role::A => Some(self.seat_b.identity_id),
            Role::B => Some(self.seat_a.identity_id),
        }
    }

    /// Returns `true` if the given identity occupies a seat.
    #[must_use]
    pub fn contains(&self, identity_id: IdentityId) -> bool {
        self.role_of(identity_id).is_some()
    }

    /// Marks the given participant's connection as attached and
    /// recomputes `ready` and phase. Returns the participant's role, or
    /// `None` if the identity is not a participant.
    ///
    /// Phase moves to `Active` once both seats are attached. Re-attach
    /// after a disconnect moves `Disconnected` back to `Active`.
    pub fn mark_attached(&mut self, identity_id: IdentityId) -> Option<Role> {
        let role = self.role_of(identity_id)?;
        match role {
            Role::A => self.seat_a.attached = true,
            Role::B => self.seat_b.attached = true,
        }
        if self.seat_a.attached && self.seat_b.attached {
            self.ready = true;
            if matches!(self.phase, SessionPhase::Matched | SessionPhase::Disconnected) {
                self.phase = SessionPhase::Active;
            }
        }
        self.last_modified_at = Utc::now();
        Some(role)
    }

    /// Marks the given participant's connection as detached. An `Active`
    /// session becomes `Disconnected`; the other seat is untouched.
    pub fn mark_detached(&mut self, identity_id: IdentityId) -> Option<Role> {
        let role = self.role_of(identity_id)?;
        match role {
            Role::A => self.seat_a.attached = false,
            Role::B => self.seat_b.attached = false,
        }
        if self.phase == SessionPhase::Active {
            self.phase = SessionPhase::Disconnected;
        }
        self.last_modified_at = Utc::now();
        Some(role)
    }

    /// Marks the given participant as having left. Returns `true` once
    /// both participants have left and the session moved to `Ended`.
    pub fn mark_left(&mut self, identity_id: IdentityId) -> Option<bool> {
        let role = self.role_of(identity_id)?;
        match role {
            Role::A => self.seat_a.left = true,
            Role::B => self.seat_b.left = true,
        }
        self.last_modified_at = Utc::now();
        if self.seat_a.left && self.seat_b.left {
            self.phase = SessionPhase::Ended;
            return Some(true);
        }
        Some(false)
    }
}
