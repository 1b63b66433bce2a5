//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands to the [`Coordinator`] and forwarding
//! filtered bus events. State-mutating work happens inside the
//! coordinator's serialized paths; this loop only suspends at the
//! transport boundary.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientCommand, WsMessage};
use super::scope::ConnectionScope;
use crate::domain::{ConnId, IdentityId, SessionEvent, SessionId};
use crate::error::CoordinatorError;
use crate::service::{Coordinator, MatchOutcome};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the
///   client.
/// - On close, reports the disconnect to the coordinator so the
///   identity leaves the queue and its session is marked disconnected.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<SessionEvent>,
    coordinator: Arc<Coordinator>,
) {
    let conn_id = ConnId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut scope = ConnectionScope::new();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response =
                            handle_text_message(&text, conn_id, &coordinator, &mut scope).await;
                        if let Some(reply) = response {
                            let json = serde_json::to_string(&reply).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(session_event) => {
                        if scope.matches(&session_event) {
                            // A start event targeting us doubles as the
                            // room join, so reconnecting clients that
                            // skip the explicit join still get room
                            // broadcasts.
                            if let SessionEvent::SessionStart { session_id, .. } = &session_event {
                                scope.join_room(*session_id);
                            }
                            let msg = WsMessage::event(
                                serde_json::to_value(&session_event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, %conn_id, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    if let Some(identity_id) = scope.identity() {
        coordinator.handle_disconnect(identity_id, conn_id).await;
    }
    tracing::debug!(%conn_id, "ws connection closed");
}

/// Handles a text frame from the client, returning an optional reply
/// envelope.
async fn handle_text_message(
    text: &str,
    conn_id: ConnId,
    coordinator: &Arc<Coordinator>,
    scope: &mut ConnectionScope,
) -> Option<WsMessage> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        let err = CoordinatorError::InvalidRequest("malformed JSON envelope".to_string());
        return Some(WsMessage::error(String::new(), &err));
    };

    let command = match serde_json::from_value::<ClientCommand>(msg.payload.clone()) {
        Ok(command) => command,
        Err(parse_err) => {
            let err = CoordinatorError::InvalidRequest(format!("bad command: {parse_err}"));
            return Some(WsMessage::error(msg.id, &err));
        }
    };

    match dispatch(command, conn_id, coordinator, scope).await {
        Ok(payload) => Some(WsMessage::response(msg.id, payload)),
        Err(err) => {
            tracing::debug!(%conn_id, error = %err, "command rejected");
            Some(WsMessage::error(msg.id, &err))
        }
    }
}

/// Executes one client command against the coordinator.
async fn dispatch(
    command: ClientCommand,
    conn_id: ConnId,
    coordinator: &Arc<Coordinator>,
    scope: &mut ConnectionScope,
) -> Result<serde_json::Value, CoordinatorError> {
    match command {
        ClientCommand::Identify {
            identity_token,
            is_guest,
        } => {
            let identity = coordinator
                .identify(identity_token.as_deref(), is_guest, conn_id)
                .await?;
            scope.set_identity(identity.identity_id);
            Ok(serde_json::json!({
                "identity_id": identity.identity_id,
                "identity_token": identity.token,
                "is_guest": identity.is_guest,
            }))
        }

        ClientCommand::RequestMatch { identity_id } => {
            let identity_id = require_own_identity(scope, identity_id)?;
            match coordinator.request_match(identity_id).await? {
                MatchOutcome::Queued => Ok(serde_json::json!({"status": "queued"})),
                MatchOutcome::Matched { session_id } => {
                    scope.join_room(session_id);
                    Ok(serde_json::json!({"status": "paired", "session_id": session_id}))
                }
                MatchOutcome::Resumed { session_id } => {
                    scope.join_room(session_id);
                    Ok(serde_json::json!({"status": "resumed", "session_id": session_id}))
                }
            }
        }

        ClientCommand::JoinSession {
            session_id,
            identity_id,
        } => {
            let identity_id = require_own_identity(scope, identity_id)?;
            let session_id = SessionId::from_uuid(session_id);
            let session = coordinator.join_session(session_id, identity_id).await?;
            scope.join_room(session.session_id);
            let Some(role) = session.role_of(identity_id) else {
                return Err(CoordinatorError::Internal(
                    "joined session without a seat".to_string(),
                ));
            };
            Ok(serde_json::json!({
                "joined": session.session_id,
                "role": role,
                "state_snapshot": session.state_snapshot,
            }))
        }

        ClientCommand::StateUpdate {
            session_id,
            identity_id,
            state_snapshot,
        } => {
            let identity_id = require_own_identity(scope, identity_id)?;
            let session_id = SessionId::from_uuid(session_id);
            coordinator
                .apply_state_update(session_id, identity_id, state_snapshot)
                .await?;
            Ok(serde_json::json!({"applied": session_id}))
        }

        ClientCommand::LeaveSession {
            session_id,
            identity_id,
        } => {
            let identity_id = require_own_identity(scope, identity_id)?;
            let session_id = SessionId::from_uuid(session_id);
            let ended = coordinator.leave_session(session_id, identity_id).await?;
            scope.leave_room(session_id);
            Ok(serde_json::json!({"left": session_id, "ended": ended}))
        }
    }
}

/// Checks that the command's identity is the one this connection
/// identified as. An unidentified connection is not admitted to any
/// coordination operation.
fn require_own_identity(
    scope: &ConnectionScope,
    claimed: uuid::Uuid,
) -> Result<IdentityId, CoordinatorError> {
    let claimed = IdentityId::from_uuid(claimed);
    match scope.identity() {
        Some(own) if own == claimed => Ok(claimed),
        Some(_) => Err(CoordinatorError::InvalidRequest(
            "identity does not belong to this connection".to_string(),
        )),
        None => Err(CoordinatorError::InvalidRequest(
            "connection has not identified".to_string(),
        )),
    }
}
