//! Concurrent session storage with per-session fine-grained locking.
//!
//! [`SessionRegistry`] stores all live sessions in a `HashMap` where
//! each entry is individually protected by a [`tokio::sync::RwLock`].
//! Updates to different sessions run concurrently; updates to the same
//! session are serialized, which gives the per-session single-writer
//! discipline the coordinator relies on.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::IdentityId;
use super::session::{Session, SessionId, SessionPhase};
use crate::error::CoordinatorError;

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, Arc<RwLock<Session>>>,
    /// Most recent session per participant, for resume lookups.
    by_participant: HashMap<IdentityId, SessionId>,
}

/// Central store for all sessions, live and ended.
///
/// Ended sessions stay in the map (process-lifetime archive) but are
/// unlinked from the participant index so `find_by_participant` never
/// resumes into them.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new session for the given pair. The first argument
    /// becomes role A. Both index entries are written under one lock so
    /// creation is all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Internal`] if the minted session ID
    /// collides with an existing one (should never happen with UUID v4).
    pub async fn create(
        &self,
        participant_a: IdentityId,
        participant_b: IdentityId,
    ) -> Result<Session, CoordinatorError> {
        let session = Session::new(participant_a, participant_b);
        let session_id = session.session_id;
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session_id) {
            return Err(CoordinatorError::Internal(format!(
                "session {session_id} already exists"
            )));
        }
        inner
            .sessions
            .insert(session_id, Arc::new(RwLock::new(session.clone())));
        inner.by_participant.insert(participant_a, session_id);
        inner.by_participant.insert(participant_b, session_id);
        Ok(session)
    }

    /// Returns the session entry behind its per-session lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleSession`] if no session with
    /// the given ID exists.
    pub async fn find_by_id(
        &self,
        session_id: SessionId,
    ) -> Result<Arc<RwLock<Session>>, CoordinatorError> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(CoordinatorError::StaleSession(session_id))
    }

    /// Returns the most recent non-ended session containing the given
    /// participant, or `None`.
    pub async fn find_by_participant(
        &self,
        identity_id: IdentityId,
    ) -> Option<Arc<RwLock<Session>>> {
        let inner = self.inner.read().await;
        let session_id = inner.by_participant.get(&identity_id)?;
        inner.sessions.get(session_id).cloned()
    }

    /// Replaces the session's `state_snapshot` verbatim.
    ///
    /// The per-session write lock serializes updates, so snapshots are
    /// applied in the order they are received for a given session.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleSession`] if the session does
    /// not exist or has ended.
    pub async fn apply_update(
        &self,
        session_id: SessionId,
        new_snapshot: String,
    ) -> Result<(), CoordinatorError> {
        let entry = self.find_by_id(session_id).await?;
        let mut session = entry.write().await;
        if session.phase == SessionPhase::Ended {
            return Err(CoordinatorError::StaleSession(session_id));
        }
        session.state_snapshot = new_snapshot;
        session.last_modified_at = chrono::Utc::now();
        Ok(())
    }

    /// Unlinks both participants from the participant index once their
    /// session has ended, so later matchmaking starts fresh.
    pub async fn unlink_participants(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        inner
            .by_participant
            .retain(|_, linked| *linked != session_id);
    }

    /// Returns the number of stored sessions (including ended ones).
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Returns `true` if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}
