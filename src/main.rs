//! matchpoint server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket coordination
//! endpoint and the health route.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use matchpoint::api;
use matchpoint::app_state::AppState;
use matchpoint::config::CoordinatorConfig;
use matchpoint::domain::{EventBus, IdentityStore, SessionRegistry};
use matchpoint::service::Coordinator;
use matchpoint::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = CoordinatorConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting matchpoint");

    // Build domain layer
    let identities = Arc::new(IdentityStore::new());
    let sessions = Arc::new(SessionRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build service layer
    let coordinator = Arc::new(Coordinator::new(identities, sessions, event_bus.clone()));

    // Build application state
    let app_state = AppState {
        coordinator,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
