//! # matchpoint
//!
//! WebSocket matchmaking and session coordinator for two-party games.
//!
//! This crate pairs anonymous or semi-persistent clients into two-party
//! sessions, assigns each party a fixed role, and keeps both parties'
//! session state synchronized across join, reconnect, and in-session
//! state updates. Game rules are delegated to the connected clients —
//! this service is a coordination layer that stores and forwards opaque
//! state snapshots.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── WS Handler (ws/)
//!     │
//!     ├── Coordinator (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── IdentityStore (domain/)
//!     ├── MatchQueue (domain/)
//!     └── SessionRegistry (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
