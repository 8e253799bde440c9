use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::BroadcastHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket broadcast hub. The write path calls
    /// [`BroadcastHub::publish`] on it after a match is persisted.
    pub hub: Arc<BroadcastHub>,
}
