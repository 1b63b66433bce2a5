//! Service layer: coordination logic.
//!
//! [`Coordinator`] orchestrates identity resolution, matchmaking, and
//! session lifecycle, and emits events through the
//! [`crate::domain::EventBus`].

pub mod coordinator;

pub use coordinator::{Coordinator, MatchOutcome};
