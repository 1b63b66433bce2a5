//! Fan-out channel for session events.
//!
//! Every coordinator mutation publishes a [`SessionEvent`] here, and
//! each WebSocket connection holds one receiver, filtering the stream
//! down to its own scope. The bus never addresses individual
//! connections; targeting is entirely the receivers' concern.

use tokio::sync::broadcast;

use super::SessionEvent;

/// Broadcast bus for [`SessionEvent`]s.
///
/// A thin wrapper over [`tokio::sync::broadcast`]. Capacity bounds the
/// ring buffer: a receiver that falls more than `capacity` events
/// behind loses the oldest ones and observes a `Lagged` error rather
/// than blocking the publishers. Cloning the bus clones the sender
/// handle; all clones feed the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a bus whose ring buffer holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many receivers will see it.
    /// With no receivers the event is dropped; publishing never fails
    /// and never blocks.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Opens a receiver positioned after the events published so far.
    /// One per WebSocket connection, taken at upgrade time.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Number of currently open receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
