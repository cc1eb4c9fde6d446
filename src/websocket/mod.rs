//! Transport gateway: WebSocket upgrade, heartbeats, per-connection
//! outbound queues, and the HTTP surface.

mod connection;
pub mod connections;
pub mod routes;
pub mod sending;

pub use connections::{ConnectionRegistry, OutboundQueues};
pub use routes::create_router;
