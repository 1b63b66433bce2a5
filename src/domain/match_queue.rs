//! FIFO matchmaking queue.
//!
//! [`MatchQueue`] holds identities waiting to be paired. One mutex
//! guards the whole queue and [`MatchQueue::enqueue`] pairs under the
//! same lock acquisition that appends, so two concurrent enqueues can
//! never both observe a one-element queue and create two sessions for
//! what should be one pair.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use super::IdentityId;

/// Result of an [`MatchQueue::enqueue`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended; still waiting for a partner.
    Queued,
    /// Already present; silent no-op.
    AlreadyQueued,
    /// The enqueue completed a pair. FIFO order: the first element is
    /// the earlier arrival and becomes role A.
    Paired(IdentityId, IdentityId),
}

/// Ordered waiting list of identities not yet paired.
///
/// Entries wait indefinitely until paired or removed; there is no
/// expiry policy. Duplicate enqueues are no-ops. The caller is
/// responsible for never enqueuing an identity that is already bound to
/// a live session.
#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: Mutex<VecDeque<IdentityId>>,
}

impl MatchQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an identity and immediately attempts to pair, all under
    /// one lock acquisition.
    pub async fn enqueue(&self, identity_id: IdentityId) -> EnqueueOutcome {
        let mut waiting = self.waiting.lock().await;
        if waiting.contains(&identity_id) {
            return EnqueueOutcome::AlreadyQueued;
        }
        waiting.push_back(identity_id);
        if waiting.len() >= 2 {
            // Drains exactly the two earliest arrivals.
            if let (Some(first), Some(second)) = (waiting.pop_front(), waiting.pop_front()) {
                return EnqueueOutcome::Paired(first, second);
            }
        }
        EnqueueOutcome::Queued
    }

    /// Removes the two earliest-enqueued identities if at least two are
    /// waiting; otherwise leaves the queue untouched.
    pub async fn try_pair(&self) -> Option<(IdentityId, IdentityId)> {
        let mut waiting = self.waiting.lock().await;
        if waiting.len() < 2 {
            return None;
        }
        match (waiting.pop_front(), waiting.pop_front()) {
            (Some(first), Some(second)) => Some((first, second)),
            _ => None,
        }
    }

    /// Removes an identity wherever it sits in the queue. Returns
    /// `true` if it was present. Called on disconnect so a dangling
    /// identity is never paired into an unreachable session.
    pub async fn remove(&self, identity_id: IdentityId) -> bool {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|id| *id != identity_id);
        waiting.len() != before
    }

    /// Returns `true` if the identity is currently waiting.
    pub async fn contains(&self, identity_id: IdentityId) -> bool {
        self.waiting.lock().await.contains(&identity_id)
    }

    /// Returns the number of waiting identities.
    pub async fn len(&self) -> usize {
        self.waiting.lock().await.len()
    }

    /// Returns `true` if nobody is waiting.
    pub async fn is_empty(&self) -> bool {
        self.waiting.lock().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lone_enqueue_waits() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        assert_eq!(queue.enqueue(a).await, EnqueueOutcome::Queued);
        assert_eq!(queue.len().await, 1);
        assert!(queue.contains(a).await);
    }

    #[tokio::test]
    async fn second_enqueue_pairs_fifo() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        let b = IdentityId::new();
        let _ = queue.enqueue(a).await;
        let outcome = queue.enqueue(b).await;
        assert_eq!(outcome, EnqueueOutcome::Paired(a, b));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_enqueue_is_noop() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        let _ = queue.enqueue(a).await;
        assert_eq!(queue.enqueue(a).await, EnqueueOutcome::AlreadyQueued);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn pairing_drains_earliest_two() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        let b = IdentityId::new();
        let c = IdentityId::new();
        let _ = queue.enqueue(a).await;
        // b pairs with a; c then waits alone.
        let EnqueueOutcome::Paired(first, second) = queue.enqueue(b).await else {
            panic!("expected pairing");
        };
        assert_eq!(first, a);
        assert_eq!(second, b);
        assert_eq!(queue.enqueue(c).await, EnqueueOutcome::Queued);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn try_pair_leaves_short_queue_untouched() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        let _ = queue.enqueue(a).await;
        assert!(queue.try_pair().await.is_none());
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn remove_while_queued() {
        let queue = MatchQueue::new();
        let a = IdentityId::new();
        let b = IdentityId::new();
        let _ = queue.enqueue(a).await;
        assert!(queue.remove(a).await);
        assert!(!queue.remove(a).await);

        // a is gone, so b waits instead of pairing with a dangler.
        assert_eq!(queue.enqueue(b).await, EnqueueOutcome::Queued);
    }

    #[tokio::test]
    async fn concurrent_enqueues_pair_exactly_once() {
        use std::sync::Arc;

        let queue = Arc::new(MatchQueue::new());
        let ids: Vec<IdentityId> = (0..8).map(|_| IdentityId::new()).collect();
        let mut handles = Vec::new();
        for id in &ids {
            let queue = Arc::clone(&queue);
            let id = *id;
            handles.push(tokio::spawn(async move { queue.enqueue(id).await }));
        }

        let mut paired = 0usize;
        for handle in handles {
            let Ok(outcome) = handle.await else {
                panic!("task failed");
            };
            if matches!(outcome, EnqueueOutcome::Paired(_, _)) {
                paired += 1;
            }
        }
        // Eight enqueues yield exactly four pairs and an empty queue.
        assert_eq!(paired, 4);
        assert!(queue.is_empty().await);
    }
}
