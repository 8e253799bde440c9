use std::fmt;

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Channel sender half for pushing frames to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Receiver half, drained by the connection's sender task.
pub type WsReceiver = mpsc::UnboundedReceiver<Message>;

/// Unique identifier for an accepted connection (server-generated).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Heartbeat state of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Answered the last probe (or has not been probed yet).
    Responsive,
    /// A probe is outstanding. Still in this state at the next sweep means
    /// the peer is evicted.
    AwaitingResponse,
}

/// One accepted peer.
///
/// Owned by the [`ConnectionRegistry`](super::registry::ConnectionRegistry);
/// dropping it drops the last outbound sender, which ends the connection's
/// sender task.
pub struct Connection {
    sender: WsSender,
    liveness: Liveness,
    connected_at: DateTime<Utc>,
    /// Cancelled to force the transport closed (eviction, shutdown).
    cancel: CancellationToken,
}

impl Connection {
    pub fn new(sender: WsSender, cancel: CancellationToken) -> Self {
        Self {
            sender,
            liveness: Liveness::Responsive,
            connected_at: Utc::now(),
            cancel,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the outbound half of the transport can still take frames.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed() && !self.cancel.is_cancelled()
    }

    /// Queue a frame if the transport is open.
    ///
    /// Returns `false` when the frame was dropped.
    pub fn send_if_open(&self, msg: Message) -> bool {
        if !self.is_open() {
            return false;
        }
        self.sender.send(msg).is_ok()
    }

    pub fn mark_responsive(&mut self) {
        self.liveness = Liveness::Responsive;
    }

    /// Flip to [`Liveness::AwaitingResponse`] and send a Ping.
    pub fn probe(&mut self) {
        self.liveness = Liveness::AwaitingResponse;
        self.send_if_open(Message::Ping(Default::default()));
    }

    /// Force the transport closed without a close handshake.
    ///
    /// Safe to call on a transport that is already gone.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    /// Queue a Close frame, then force the transport closed.
    pub fn close(&self) {
        self.send_if_open(Message::Close(None));
        self.cancel.cancel();
    }
}
