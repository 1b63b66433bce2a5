//! Coordinator configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment
//! variables (or a `.env` file via `dotenvy`), with sensible defaults
//! for local development.

use std::net::SocketAddr;

/// Top-level service configuration.
///
/// Loaded once at startup via [`CoordinatorConfig::from_env`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,
}

impl CoordinatorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 10_000);

        Ok(Self {
            listen_addr,
            event_bus_capacity,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on
/// missing or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
