//! Session coordinator: orchestrates identity, matchmaking, and sessions.
//!
//! [`Coordinator`] drives the full lifecycle: a connection identifies,
//! requests a match, and is either enqueued, paired into a fresh
//! session, or resumed into the session it already holds. Every
//! mutation follows the pattern: acquire lock → mutate → emit events →
//! return result. Matchmaking keys off the durable identity, never the
//! transient connection, so reconnects land back in the same session
//! with the same role.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{
    ConnId, EnqueueOutcome, EventBus, Identity, IdentityId, IdentityStore, MatchQueue,
    SessionEvent, SessionId, SessionPhase, SessionRegistry,
};
use crate::error::CoordinatorError;

/// Result of a `request_match` call, mirrored into the wire response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Waiting in the queue for a partner.
    Queued,
    /// Paired into a session (fresh, or a pending one that just became
    /// ready).
    Matched {
        /// The session the identity was paired into.
        session_id: SessionId,
    },
    /// Re-attached to an existing session that was already ready.
    Resumed {
        /// The resumed session.
        session_id: SessionId,
    },
}

/// Orchestration layer for identity, queue, and session operations.
///
/// Owns the [`MatchQueue`] and holds shared references to the
/// [`IdentityStore`] and [`SessionRegistry`]. Queue admission and
/// pairing happen under a single queue lock; per-session mutations go
/// through the registry's per-session locks. On top of that, the whole
/// session-check → enqueue → create sequence of [`request_match`] is
/// serialized by the admission mutex, so an identity can never be
/// observed both waiting in the queue and seated in a session.
///
/// [`request_match`]: Coordinator::request_match
#[derive(Debug)]
pub struct Coordinator {
    identities: Arc<IdentityStore>,
    sessions: Arc<SessionRegistry>,
    queue: MatchQueue,
    event_bus: EventBus,
    /// Serializes `request_match` end to end. The queue lock alone
    /// leaves a window between draining a pair and inserting the
    /// session, during which a drained identity's next request would
    /// see no session and re-enter the queue.
    admission: Mutex<()>,
}

impl Coordinator {
    /// Creates a new `Coordinator` with an empty matchmaking queue.
    #[must_use]
    pub fn new(
        identities: Arc<IdentityStore>,
        sessions: Arc<SessionRegistry>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            identities,
            sessions,
            queue: MatchQueue::new(),
            event_bus,
            admission: Mutex::new(()),
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`IdentityStore`].
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityStore> {
        &self.identities
    }

    /// Returns a reference to the inner [`SessionRegistry`].
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Returns a reference to the matchmaking queue.
    #[must_use]
    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Resolves or creates an identity for the given token and attaches
    /// the connection to it. A missing token mints a fresh one
    /// server-side.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::IdentityResolution`] if storage
    /// fails to resolve the token; the connection is not admitted to
    /// matchmaking until identified.
    pub async fn identify(
        &self,
        token: Option<&str>,
        is_guest: bool,
        conn: ConnId,
    ) -> Result<Identity, CoordinatorError> {
        let minted;
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => {
                minted = uuid::Uuid::new_v4().to_string();
                minted.as_str()
            }
        };
        let mut identity = self.identities.resolve_or_create(token, is_guest).await?;
        self.identities
            .attach_connection(identity.identity_id, conn)
            .await?;
        identity.connection = Some(conn);

        tracing::info!(
            identity_id = %identity.identity_id,
            is_guest = identity.is_guest,
            %conn,
            "identity attached"
        );
        Ok(identity)
    }

    /// Enqueues the identity for pairing, or resumes its existing
    /// session.
    ///
    /// An identity already holding a non-ended session is never
    /// enqueued: it is re-attached to that session instead. A duplicate
    /// enqueue is a silent no-op. When the enqueue completes a pair,
    /// the session is created, roles are fixed in FIFO order, and a
    /// `session_start` event is emitted to both participants.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::IdentityNotFound`] if the identity
    /// was never resolved.
    pub async fn request_match(
        &self,
        identity_id: IdentityId,
    ) -> Result<MatchOutcome, CoordinatorError> {
        // Ensure the identity exists before touching the queue.
        let _ = self.identities.get(identity_id).await?;

        // Held until the session (if any) is inserted, so a concurrent
        // request from a just-drained identity cannot slip between the
        // pair drain and the registry insert and re-enqueue itself.
        let _admission = self.admission.lock().await;

        if let Some(entry) = self.sessions.find_by_participant(identity_id).await {
            return self.resume(identity_id, &entry).await;
        }

        match self.queue.enqueue(identity_id).await {
            EnqueueOutcome::AlreadyQueued => Ok(MatchOutcome::Queued),
            EnqueueOutcome::Queued => {
                let _ = self.event_bus.publish(SessionEvent::MatchPending {
                    identity_id,
                    timestamp: Utc::now(),
                });
                tracing::debug!(%identity_id, "identity queued for matchmaking");
                Ok(MatchOutcome::Queued)
            }
            EnqueueOutcome::Paired(first, second) => self.create_session(first, second).await,
        }
    }

    /// Re-attaches a returning participant to its existing session.
    ///
    /// If the session was already ready, the `session_start` event is
    /// re-emitted to the returning side only, carrying the latest
    /// snapshot and the original role. If this attach is what completes
    /// the pair, both sides receive the start event.
    async fn resume(
        &self,
        identity_id: IdentityId,
        entry: &Arc<tokio::sync::RwLock<crate::domain::Session>>,
    ) -> Result<MatchOutcome, CoordinatorError> {
        let mut session = entry.write().await;
        let session_id = session.session_id;
        let was_ready = session.ready;

        let Some(role) = session.mark_attached(identity_id) else {
            return Err(CoordinatorError::Internal(format!(
                "participant index linked {identity_id} to foreign session {session_id}"
            )));
        };
        let snapshot = session.state_snapshot.clone();
        let now_ready = session.ready;
        drop(session);

        if was_ready {
            let _ = self.event_bus.publish(SessionEvent::SessionStart {
                identity_id,
                session_id,
                role,
                state_snapshot: snapshot,
                resumed: true,
                timestamp: Utc::now(),
            });
            tracing::info!(%identity_id, %session_id, %role, "session resumed");
            return Ok(MatchOutcome::Resumed { session_id });
        }

        if now_ready {
            // This attach completed the pair; both sides start now.
            self.emit_session_start(session_id, entry).await;
            tracing::info!(%session_id, "session became ready");
            return Ok(MatchOutcome::Matched { session_id });
        }

        // Still waiting for the other participant to attach.
        tracing::debug!(%identity_id, %session_id, "attached, awaiting partner");
        Ok(MatchOutcome::Matched { session_id })
    }

    /// Creates a session for a freshly paired couple. The first
    /// identity (earlier enqueue) becomes role A.
    async fn create_session(
        &self,
        first: IdentityId,
        second: IdentityId,
    ) -> Result<MatchOutcome, CoordinatorError> {
        let session = self.sessions.create(first, second).await?;
        let session_id = session.session_id;
        let entry = self.sessions.find_by_id(session_id).await?;

        {
            let mut locked = entry.write().await;
            // Only identities with a live handle count as attached;
            // the other side attaches on its next request_match.
            for id in [first, second] {
                let connected = self
                    .identities
                    .get(id)
                    .await
                    .map(|identity| identity.connection.is_some())
                    .unwrap_or(false);
                if connected {
                    let _ = locked.mark_attached(id);
                }
            }
        }

        let ready = entry.read().await.ready;
        if ready {
            self.emit_session_start(session_id, &entry).await;
        }

        tracing::info!(
            %session_id,
            participant_a = %first,
            participant_b = %second,
            ready,
            "session created"
        );
        Ok(MatchOutcome::Matched { session_id })
    }

    /// Emits `session_start` to both participants with their own role
    /// and the current snapshot.
    async fn emit_session_start(
        &self,
        session_id: SessionId,
        entry: &Arc<tokio::sync::RwLock<crate::domain::Session>>,
    ) {
        let session = entry.read().await;
        let snapshot = session.state_snapshot.clone();
        let seats = [
            (session.seat_a.identity_id, crate::domain::Role::A),
            (session.seat_b.identity_id, crate::domain::Role::B),
        ];
        drop(session);

        for (identity_id, role) in seats {
            let _ = self.event_bus.publish(SessionEvent::SessionStart {
                identity_id,
                session_id,
                role,
                state_snapshot: snapshot.clone(),
                resumed: false,
                timestamp: Utc::now(),
            });
        }
    }

    /// Validates an explicit room join and returns the session record
    /// for the acknowledging client.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleSession`] if the session does
    /// not exist or has ended, and [`CoordinatorError::InvalidRequest`]
    /// if the identity is not a participant.
    pub async fn join_session(
        &self,
        session_id: SessionId,
        identity_id: IdentityId,
    ) -> Result<crate::domain::Session, CoordinatorError> {
        let entry = self.sessions.find_by_id(session_id).await?;
        let session = entry.read().await;
        if session.phase == SessionPhase::Ended {
            return Err(CoordinatorError::StaleSession(session_id));
        }
        if !session.contains(identity_id) {
            return Err(CoordinatorError::InvalidRequest(format!(
                "{identity_id} is not a participant of {session_id}"
            )));
        }
        Ok(session.clone())
    }

    /// Stores a new state snapshot verbatim and forwards it to the
    /// session room. The snapshot is never interpreted; move legality
    /// lives in the clients' game engine.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleSession`] for an ended or
    /// unknown session and [`CoordinatorError::InvalidRequest`] if the
    /// sender is not a participant. No state is mutated on error.
    pub async fn apply_state_update(
        &self,
        session_id: SessionId,
        from: IdentityId,
        snapshot: String,
    ) -> Result<(), CoordinatorError> {
        let entry = self.sessions.find_by_id(session_id).await?;
        {
            let session = entry.read().await;
            if !session.contains(from) {
                return Err(CoordinatorError::InvalidRequest(format!(
                    "{from} is not a participant of {session_id}"
                )));
            }
        }
        self.sessions
            .apply_update(session_id, snapshot.clone())
            .await?;

        let _ = self.event_bus.publish(SessionEvent::StateUpdate {
            session_id,
            from,
            state_snapshot: snapshot,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Records an explicit leave. When both participants have left, the
    /// session ends, the participant index is unlinked, and a
    /// `session_ended` event goes to the room. Returns `true` once the
    /// session has ended.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::StaleSession`] for an ended or
    /// unknown session and [`CoordinatorError::InvalidRequest`] if the
    /// identity is not a participant.
    pub async fn leave_session(
        &self,
        session_id: SessionId,
        identity_id: IdentityId,
    ) -> Result<bool, CoordinatorError> {
        let entry = self.sessions.find_by_id(session_id).await?;
        let ended = {
            let mut session = entry.write().await;
            if session.phase == SessionPhase::Ended {
                return Err(CoordinatorError::StaleSession(session_id));
            }
            let Some(ended) = session.mark_left(identity_id) else {
                return Err(CoordinatorError::InvalidRequest(format!(
                    "{identity_id} is not a participant of {session_id}"
                )));
            };
            ended
        };

        if ended {
            self.sessions.unlink_participants(session_id).await;
            let _ = self.event_bus.publish(SessionEvent::SessionEnded {
                session_id,
                timestamp: Utc::now(),
            });
            tracing::info!(%session_id, "session ended");
        }
        Ok(ended)
    }

    /// Handles a connection closing.
    ///
    /// Clears the identity's handle (only if this connection is still
    /// the current one), removes the identity from the queue if it was
    /// waiting, and marks an active session disconnected. Never
    /// destroys a session or rolls back state.
    pub async fn handle_disconnect(&self, identity_id: IdentityId, conn: ConnId) {
        let was_current = self.identities.detach_connection(identity_id, conn).await;
        if !was_current {
            // A newer connection superseded this one; nothing to do.
            tracing::debug!(%identity_id, %conn, "stale connection closed");
            return;
        }

        if self.queue.remove(identity_id).await {
            tracing::debug!(%identity_id, "removed from matchmaking queue");
        }

        if let Some(entry) = self.sessions.find_by_participant(identity_id).await {
            let mut session = entry.write().await;
            if session.phase != SessionPhase::Ended {
                let _ = session.mark_detached(identity_id);
                tracing::info!(
                    %identity_id,
                    session_id = %session.session_id,
                    phase = ?session.phase,
                    "participant disconnected"
                );
            }
        }
    }
}
