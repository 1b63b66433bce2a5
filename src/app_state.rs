//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::Coordinator;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session coordinator for all coordination logic.
    pub coordinator: Arc<Coordinator>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
