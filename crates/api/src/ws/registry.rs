use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::RwLock;

use crate::ws::connection::{Connection, ConnectionId, Liveness};

/// Outcome of one heartbeat pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections that were sent a fresh probe.
    pub probed: usize,
    /// Connections evicted for missing the previous probe.
    pub evicted: usize,
}

/// The set of currently accepted connections.
///
/// Thread-safe via interior `RwLock`; every access point (accept, close,
/// heartbeat sweep, broadcast) goes through it. Traversals never hold the
/// lock across an `.await`, since pushing a frame is a non-blocking channel
/// send.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a connection.
    ///
    /// `greeting` is queued on the connection before it becomes visible to
    /// other traversals, so it is guaranteed to be the first frame the peer
    /// receives.
    pub async fn register(&self, id: ConnectionId, conn: Connection, greeting: Option<Message>) {
        let mut conns = self.connections.write().await;
        if let Some(msg) = greeting {
            if !conn.send_if_open(msg) {
                tracing::debug!(conn_id = %id, "Greeting dropped, transport not open");
            }
        }
        conns.insert(id, conn);
    }

    /// Remove a connection. Removing an unknown id is a no-op.
    ///
    /// Returns the removed connection so the caller can log its lifetime.
    pub async fn unregister(&self, id: &ConnectionId) -> Option<Connection> {
        self.connections.write().await.remove(id)
    }

    /// Record a probe response from `id`. Unknown ids are ignored.
    pub async fn mark_responsive(&self, id: &ConnectionId) {
        if let Some(conn) = self.connections.write().await.get_mut(id) {
            conn.mark_responsive();
        }
    }

    /// Apply `visitor` to every registered connection.
    ///
    /// The read lock is held for the whole traversal, so concurrent
    /// removals wait until it completes.
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&ConnectionId, &Connection),
    {
        let conns = self.connections.read().await;
        for (id, conn) in conns.iter() {
            visitor(id, conn);
        }
    }

    /// Queue `message` on every open connection.
    ///
    /// Closed connections are skipped; they are cleaned up by their own
    /// close path. Returns the number of connections the frame was queued
    /// for.
    pub async fn broadcast(&self, message: &Message) -> usize {
        let mut delivered = 0;
        self.for_each(|id, conn| {
            if conn.send_if_open(message.clone()) {
                delivered += 1;
            } else {
                tracing::trace!(conn_id = %id, "Skipping non-open connection");
            }
        })
        .await;
        delivered
    }

    /// Run one heartbeat pass.
    ///
    /// Connections still awaiting a response from the previous pass are
    /// terminated and removed in place; every other connection is flipped
    /// to awaiting and sent a fresh Ping.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut conns = self.connections.write().await;

        conns.retain(|id, conn| match conn.liveness() {
            Liveness::AwaitingResponse => {
                tracing::info!(conn_id = %id, "Evicting unresponsive WebSocket connection");
                conn.terminate();
                report.evicted += 1;
                false
            }
            Liveness::Responsive => {
                conn.probe();
                report.probed += 1;
                true
            }
        });

        report
    }

    /// Return the current number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the set.
    ///
    /// Returns how many connections were closed.
    pub async fn drain(&self) -> usize {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            conn.close();
        }
        conns.clear();
        count
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
