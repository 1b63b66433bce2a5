//! Domain events reflecting session lifecycle and state changes.
//!
//! Every coordinator mutation publishes a [`SessionEvent`] through the
//! [`super::EventBus`]. Each WebSocket connection subscribes once and
//! filters events to its own identity and joined session rooms, which
//! is how identity-targeted emits and room broadcasts are delivered.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::IdentityId;
use super::session::{Role, SessionId};

/// Event emitted after a coordinator state change.
///
/// `MatchPending` and `SessionStart` are addressed to a single
/// identity; `StateUpdate` and `SessionEnded` are addressed to a
/// session room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The identity was enqueued and is waiting for a partner.
    MatchPending {
        /// Target identity.
        identity_id: IdentityId,
        /// Enqueue timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The session is ready for this participant: sent to each side
    /// once both are attached, and again to the resuming side only on
    /// reconnect.
    SessionStart {
        /// Target identity.
        identity_id: IdentityId,
        /// Session identifier (also the room name).
        session_id: SessionId,
        /// The target's fixed role, assigned at session creation.
        role: Role,
        /// Latest shared state snapshot, verbatim.
        state_snapshot: String,
        /// `true` when re-emitted on reconnect.
        resumed: bool,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant replaced the shared state snapshot.
    StateUpdate {
        /// Session room the update belongs to.
        session_id: SessionId,
        /// Participant that produced the update; the connection loop
        /// skips delivery back to the producer.
        from: IdentityId,
        /// New snapshot, verbatim.
        state_snapshot: String,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Both participants left; the session accepts no further events.
    SessionEnded {
        /// Session room that ended.
        session_id: SessionId,
        /// End timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the target identity for identity-addressed events.
    #[must_use]
    pub fn identity_id(&self) -> Option<IdentityId> {
        match self {
            Self::MatchPending { identity_id, .. } | Self::SessionStart { identity_id, .. } => {
                Some(*identity_id)
            }
            Self::StateUpdate { .. } | Self::SessionEnded { .. } => None,
        }
    }

    /// Returns the session room for room-addressed events.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::SessionStart { session_id, .. }
            | Self::StateUpdate { session_id, .. }
            | Self::SessionEnded { session_id, .. } => Some(*session_id),
            Self::MatchPending { .. } => None,
        }
    }

    /// Returns the wire event name as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::MatchPending { .. } => "match_pending",
            Self::SessionStart { .. } => "session_start",
            Self::StateUpdate { .. } => "state_update",
            Self::SessionEnded { .. } => "session_ended",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn session_start_serializes_with_role() {
        let event = SessionEvent::SessionStart {
            identity_id: IdentityId::new(),
            session_id: SessionId::new(),
            role: Role::A,
            state_snapshot: "pos:init".to_string(),
            resumed: false,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event);
        assert!(json.is_ok());
        let json_str = json.unwrap_or_default();
        assert!(json_str.contains("session_start"));
        assert!(json_str.contains("\"role\":\"a\""));
        assert!(json_str.contains("pos:init"));
    }

    #[test]
    fn addressing_accessors() {
        let identity = IdentityId::new();
        let session = SessionId::new();

        let pending = SessionEvent::MatchPending {
            identity_id: identity,
            timestamp: Utc::now(),
        };
        assert_eq!(pending.identity_id(), Some(identity));
        assert_eq!(pending.session_id(), None);
        assert_eq!(pending.event_type_str(), "match_pending");

        let update = SessionEvent::StateUpdate {
            session_id: session,
            from: identity,
            state_snapshot: String::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(update.identity_id(), None);
        assert_eq!(update.session_id(), Some(session));
        assert_eq!(update.event_type_str(), "state_update");
    }
}
