//! WebSocket message types: envelope, commands, and event wrapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoordinatorError;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a `response` envelope correlated to a command ID.
    #[must_use]
    pub fn response(id: String, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type: WsMessageType::Response,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an `event` envelope with a server-generated ID.
    #[must_use]
    pub fn event(payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            msg_type: WsMessageType::Event,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an `error` envelope from a [`CoordinatorError`],
    /// correlated to the offending command ID.
    #[must_use]
    pub fn error(id: String, err: &CoordinatorError) -> Self {
        Self {
            id,
            msg_type: WsMessageType::Error,
            timestamp: Utc::now(),
            payload: serde_json::json!({
                "code": err.error_code(),
                "message": err.to_string(),
            }),
        }
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Resolve or create an identity and attach this connection to it.
    Identify {
        /// Opaque client token; omitted on first contact, in which case
        /// the server mints one.
        #[serde(default)]
        identity_token: Option<String>,
        /// Whether the client is a guest.
        #[serde(default)]
        is_guest: bool,
    },
    /// Enqueue for pairing, or resume an existing session.
    RequestMatch {
        /// The durable identity requesting a match.
        identity_id: uuid::Uuid,
    },
    /// Explicit room join acknowledgment for a session.
    JoinSession {
        /// Session to join.
        session_id: uuid::Uuid,
        /// Joining identity.
        identity_id: uuid::Uuid,
    },
    /// Replace the session's shared state snapshot.
    StateUpdate {
        /// Target session.
        session_id: uuid::Uuid,
        /// Producing identity.
        identity_id: uuid::Uuid,
        /// Opaque serialized state, stored and forwarded verbatim.
        state_snapshot: String,
    },
    /// Explicitly leave a session. The session ends once both
    /// participants have left.
    LeaveSession {
        /// Target session.
        session_id: uuid::Uuid,
        /// Leaving identity.
        identity_id: uuid::Uuid,
    },
}
