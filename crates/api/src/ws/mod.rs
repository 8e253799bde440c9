//! WebSocket infrastructure for real-time match notifications.
//!
//! Provides the connection registry, heartbeat monitoring, the broadcast
//! hub used by the write path, and the HTTP upgrade handler used by Axum
//! routes.

pub mod connection;
mod handler;
mod heartbeat;
pub mod hub;
pub mod message;
pub mod registry;

pub use connection::{Connection, ConnectionId, Liveness};
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use hub::BroadcastHub;
pub use message::{InboundFrame, ServerMessage};
pub use registry::{ConnectionRegistry, SweepReport};
