//! Typed identifiers and the durable identity record.
//!
//! [`IdentityId`] identifies one client across reconnects, independent of
//! any single live connection. [`ConnId`] identifies one WebSocket
//! connection; identities hold at most one `ConnId` at a time and a newer
//! connection supersedes the old handle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a client identity.
///
/// Wraps a UUID v4, minted once on first contact and stable across
/// reconnects. Used as the key in [`super::IdentityStore`], as a queue
/// element in [`super::MatchQueue`], and as an event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(uuid::Uuid);

impl IdentityId {
    /// Creates a new random `IdentityId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `IdentityId` from an existing [`uuid::Uuid`].
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

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a live WebSocket connection.
///
/// Minted at upgrade time. An identity stores its last known `ConnId` as
/// the connection handle; comparing handles lets a stale connection's
/// teardown detect that it has been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(uuid::Uuid);

impl ConnId {
    /// Creates a new random `ConnId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable record for one client.
///
/// The `connection` field is a reference to the last known live
/// connection, never used to infer liveness beyond "last known". The
/// `token` is the client-supplied (or server-minted) opaque string the
/// client presents on every `identify`.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable identity identifier (immutable after creation).
    pub identity_id: IdentityId,
    /// Opaque client token used to resolve this identity on reconnect.
    pub token: String,
    /// Whether this identity was created as a guest (immutable).
    pub is_guest: bool,
    /// Last known live connection, if any. Overwritten on every
    /// reconnect; at most one handle per identity at a time.
    pub connection: Option<ConnId>,
}

impl Identity {
    /// Creates a new identity with no attached connection.
    #[must_use]
    pub fn new(token: String, is_guest: bool) -> Self {
        Self {
            identity_id: IdentityId::new(),
            token,
            is_guest,
            connection: None,
        }
    }
}
