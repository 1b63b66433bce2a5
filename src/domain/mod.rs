//! Domain layer: identities, sessions, matchmaking, and events.
//!
//! This module contains the server-side domain model: durable client
//! identities and their connection handles, the two-party session
//! aggregate with fixed roles, the FIFO matchmaking queue, the session
//! registry for concurrent session storage, and the event bus for
//! broadcasting state changes.

pub mod event_bus;
pub mod identity;
pub mod identity_store;
pub mod match_queue;
pub mod session;
pub mod session_event;
pub mod session_registry;

pub use event_bus::EventBus;
pub use identity::{ConnId, Identity, IdentityId};
pub use identity_store::IdentityStore;
pub use match_queue::{EnqueueOutcome, MatchQueue};
pub use session::{Role, Session, SessionId, SessionPhase};
pub use session_event::SessionEvent;
pub use session_registry::SessionRegistry;
