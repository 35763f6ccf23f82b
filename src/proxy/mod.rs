//! Reverse proxy functionality
//!
//! Host-based route lookup and the client/upstream byte bridge.

pub mod bridge;
pub mod routes;

pub use bridge::{Bridge, RelayStats};
pub use routes::{RouteEntry, RoutingTable};
