//! In-memory identity storage keyed by client token.
//!
//! [`IdentityStore`] resolves an opaque client token to a durable
//! [`Identity`] record and tracks the last known connection handle per
//! identity. All mutations go through one `RwLock` so token lookup and
//! identity creation are atomic with respect to each other.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::identity::{ConnId, Identity, IdentityId};
use crate::error::CoordinatorError;

#[derive(Debug, Default)]
struct StoreInner {
    by_token: HashMap<String, IdentityId>,
    identities: HashMap<IdentityId, Identity>,
}

/// Durable (process-lifetime) mapping from client token to identity.
///
/// # Concurrency
///
/// A single `RwLock` guards both indexes; `resolve_or_create` holds the
/// write lock across lookup and insert, so two concurrent `identify`
/// calls with the same token can never mint two identities.
#[derive(Debug, Default)]
pub struct IdentityStore {
    inner: RwLock<StoreInner>,
}

impl IdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an identity by token, minting a new one if absent.
    ///
    /// `is_guest` is recorded at creation and immutable afterwards; a
    /// returning token keeps its original guest flag regardless of what
    /// the reconnecting client claims.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::IdentityResolution`] if the stored
    /// record for a known token is missing (index corruption).
    pub async fn resolve_or_create(
        &self,
        token: &str,
        is_guest: bool,
    ) -> Result<Identity, CoordinatorError> {
        let mut inner = self.inner.write().await;
        if let Some(id) = inner.by_token.get(token).copied() {
            return inner.identities.get(&id).cloned().ok_or_else(|| {
                CoordinatorError::IdentityResolution(format!(
                    "token index points at missing identity {id}"
                ))
            });
        }
        let identity = Identity::new(token.to_string(), is_guest);
        inner.by_token.insert(token.to_string(), identity.identity_id);
        inner
            .identities
            .insert(identity.identity_id, identity.clone());
        Ok(identity)
    }

    /// Returns a clone of the identity record.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::IdentityNotFound`] if no identity
    /// with the given ID exists.
    pub async fn get(&self, identity_id: IdentityId) -> Result<Identity, CoordinatorError> {
        let inner = self.inner.read().await;
        inner
            .identities
            .get(&identity_id)
            .cloned()
            .ok_or(CoordinatorError::IdentityNotFound(identity_id))
    }

    /// Overwrites the stored connection handle for an identity.
    ///
    /// Idempotent; a newer connection supersedes the old handle
    /// atomically under the store's write lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::IdentityNotFound`] if no identity
    /// with the given ID exists.
    pub async fn attach_connection(
        &self,
        identity_id: IdentityId,
        conn: ConnId,
    ) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.write().await;
        let identity = inner
            .identities
            .get_mut(&identity_id)
            .ok_or(CoordinatorError::IdentityNotFound(identity_id))?;
        identity.connection = Some(conn);
        Ok(())
    }

    /// Clears the stored handle only if it still equals `conn`.
    ///
    /// Returns `true` if the handle was cleared. A stale connection's
    /// teardown calling this after a supersede is a no-op, so a
    /// reconnect's fresh handle is never clobbered.
    pub async fn detach_connection(&self, identity_id: IdentityId, conn: ConnId) -> bool {
        let mut inner = self.inner.write().await;
        match inner.identities.get_mut(&identity_id) {
            Some(identity) if identity.connection == Some(conn) => {
                identity.connection = None;
                true
            }
            _ => false,
        }
    }

    /// Returns the number of known identities.
    pub async fn len(&self) -> usize {
        self.inner.read().await.identities.len()
    }

    /// Returns `true` if no identities are known.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.identities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_token_resolves_same_identity() {
        let store = IdentityStore::new();
        let Ok(first) = store.resolve_or_create("tok-1", true).await else {
            panic!("resolution failed");
        };
        let Ok(second) = store.resolve_or_create("tok-1", true).await else {
            panic!("resolution failed");
        };
        assert_eq!(first.identity_id, second.identity_id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn distinct_tokens_mint_distinct_identities() {
        let store = IdentityStore::new();
        let Ok(a) = store.resolve_or_create("tok-a", true).await else {
            panic!("resolution failed");
        };
        let Ok(b) = store.resolve_or_create("tok-b", false).await else {
            panic!("resolution failed");
        };
        assert_ne!(a.identity_id, b.identity_id);
        assert!(a.is_guest);
        assert!(!b.is_guest);
    }

    #[tokio::test]
    async fn guest_flag_is_immutable_after_creation() {
        let store = IdentityStore::new();
        let Ok(first) = store.resolve_or_create("tok-1", true).await else {
            panic!("resolution failed");
        };
        let Ok(again) = store.resolve_or_create("tok-1", false).await else {
            panic!("resolution failed");
        };
        assert_eq!(first.identity_id, again.identity_id);
        assert!(again.is_guest);
    }

    #[tokio::test]
    async fn attach_overwrites_previous_handle() {
        let store = IdentityStore::new();
        let Ok(identity) = store.resolve_or_create("tok-1", true).await else {
            panic!("resolution failed");
        };
        let old = ConnId::new();
        let new = ConnId::new();

        assert!(store.attach_connection(identity.identity_id, old).await.is_ok());
        assert!(store.attach_connection(identity.identity_id, new).await.is_ok());

        let Ok(fetched) = store.get(identity.identity_id).await else {
            panic!("identity missing");
        };
        assert_eq!(fetched.connection, Some(new));
    }

    #[tokio::test]
    async fn stale_detach_does_not_clobber_supersede() {
        let store = IdentityStore::new();
        let Ok(identity) = store.resolve_or_create("tok-1", true).await else {
            panic!("resolution failed");
        };
        let old = ConnId::new();
        let new = ConnId::new();
        let _ = store.attach_connection(identity.identity_id, old).await;
        let _ = store.attach_connection(identity.identity_id, new).await;

        // Old connection tears down after the reconnect superseded it.
        assert!(!store.detach_connection(identity.identity_id, old).await);

        let Ok(fetched) = store.get(identity.identity_id).await else {
            panic!("identity missing");
        };
        assert_eq!(fetched.connection, Some(new));

        // Detaching the current handle does clear it.
        assert!(store.detach_connection(identity.identity_id, new).await);
        let Ok(fetched) = store.get(identity.identity_id).await else {
            panic!("identity missing");
        };
        assert_eq!(fetched.connection, None);
    }

    #[tokio::test]
    async fn attach_unknown_identity_fails() {
        let store = IdentityStore::new();
        let result = store.attach_connection(IdentityId::new(), ConnId::new()).await;
        assert!(result.is_err());
    }
}
