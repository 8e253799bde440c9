use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::ws::connection::{Connection, ConnectionId, WsReceiver};
use crate::ws::heartbeat::start_heartbeat;
use crate::ws::message::ServerMessage;
use crate::ws::registry::{ConnectionRegistry, SweepReport};

/// How long `close()` waits for the heartbeat task to observe cancellation.
const HEARTBEAT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles returned to the transport layer for a freshly accepted peer.
pub struct Accepted {
    pub id: ConnectionId,
    /// Frames queued for this peer, starting with the welcome frame.
    pub outbound: WsReceiver,
    /// Cancelled when the hub forces this connection closed.
    pub cancel: CancellationToken,
}

/// Fan-out hub for match notifications.
///
/// Owns the [`ConnectionRegistry`] and the heartbeat task. Created once at
/// startup with [`BroadcastHub::start`], shared via `Arc`, and torn down with
/// [`BroadcastHub::close`].
pub struct BroadcastHub {
    config: HubConfig,
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastHub {
    /// Validate `config`, create the hub and start its heartbeat.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: HubConfig) -> HubResult<Arc<Self>> {
        validate(&config)?;

        let registry = Arc::new(ConnectionRegistry::new());
        let shutdown = CancellationToken::new();
        let heartbeat = start_heartbeat(
            Arc::clone(&registry),
            config.heartbeat_interval,
            shutdown.child_token(),
        );

        tracing::info!(
            path = %config.path,
            max_frame_bytes = config.max_frame_bytes,
            "WebSocket broadcast hub started"
        );

        Ok(Arc::new(Self {
            config,
            registry,
            shutdown,
            closed: AtomicBool::new(false),
            heartbeat: Mutex::new(Some(heartbeat)),
        }))
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register a newly accepted peer and queue its welcome frame.
    ///
    /// Returns `None` once the hub is closed; the caller should drop the
    /// transport.
    pub async fn accept(&self) -> Option<Accepted> {
        if self.is_closed() {
            return None;
        }

        let id = ConnectionId::new();
        let (tx, outbound) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();
        let conn = Connection::new(tx, cancel.clone());

        let welcome = match ServerMessage::Welcome.to_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode welcome frame");
                None
            }
        };
        self.registry.register(id.clone(), conn, welcome).await;

        Some(Accepted {
            id,
            outbound,
            cancel,
        })
    }

    /// Record a Pong from `id`.
    pub async fn mark_responsive(&self, id: &ConnectionId) {
        self.registry.mark_responsive(id).await;
    }

    /// Remove `id` after its transport closed. Idempotent.
    pub async fn disconnect(&self, id: &ConnectionId) -> Option<Connection> {
        self.registry.unregister(id).await
    }

    /// Broadcast a `match_created` frame carrying `payload` to every open
    /// connection.
    ///
    /// The payload is serialized once. Connections that are no longer open
    /// are skipped, and a failed push to one connection never affects the
    /// others. Returns how many connections the frame was queued for.
    ///
    /// # Errors
    ///
    /// [`HubError::Serialize`] if `payload` cannot be represented as JSON.
    /// Nothing is sent in that case.
    pub async fn publish<T>(&self, payload: &T) -> HubResult<usize>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(payload)?;
        let frame = ServerMessage::MatchCreated { data }.to_frame()?;

        let delivered = self.registry.broadcast(&frame).await;
        tracing::debug!(delivered, "Broadcast match_created");
        Ok(delivered)
    }

    /// Run one heartbeat pass immediately, outside the timer.
    pub async fn sweep(&self) -> SweepReport {
        self.registry.sweep().await
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }

    /// Stop the heartbeat and close every remaining connection.
    ///
    /// Calling this more than once is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shutdown.cancel();

        let handle = self
            .heartbeat
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if tokio::time::timeout(HEARTBEAT_STOP_TIMEOUT, handle)
                .await
                .is_err()
            {
                tracing::warn!("Heartbeat task did not stop in time");
            }
        }

        let count = self.registry.drain().await;
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

fn validate(config: &HubConfig) -> HubResult<()> {
    if config.heartbeat_interval.is_zero() {
        return Err(HubError::InvalidConfig(
            "heartbeat interval must be greater than zero".into(),
        ));
    }
    if config.max_frame_bytes == 0 {
        return Err(HubError::InvalidConfig(
            "max frame size must be greater than zero".into(),
        ));
    }

    let path = config.path.as_str();
    let well_formed = path.len() > 1
        && path.starts_with('/')
        && !path
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '*' | ':' | '?' | '#'));
    if !well_formed {
        return Err(HubError::InvalidConfig(format!(
            "path '{path}' must be a literal route such as /ws"
        )));
    }

    Ok(())
}
