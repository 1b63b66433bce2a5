//! WebSocket layer: connection handling, message routing, delivery scope.
//!
//! The WebSocket endpoint at `/ws` is the event channel: clients
//! identify, request matches, and exchange session state over it.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod scope;
