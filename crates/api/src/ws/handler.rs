use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::hub::{Accepted, BroadcastHub};
use crate::ws::message::InboundFrame;

/// How long a closing connection may spend flushing queued frames.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP handler that upgrades the connection to WebSocket.
///
/// Oversized inbound frames are rejected by the transport, using the hub's
/// configured limit. After the upgrade the connection is registered with the
/// hub and served by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let max_bytes = state.hub.config().max_frame_bytes;

    ws.max_frame_size(max_bytes)
        .max_message_size(max_bytes)
        .on_failed_upgrade(|error| {
            tracing::warn!(error = %error, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Serve a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub (which queues the welcome frame).
///   2. Spawns a sender task that forwards frames from the hub channel.
///   3. Processes inbound frames on the current task until the peer closes,
///      the transport fails, or the hub forces the connection closed.
///   4. Unregisters and lets the sender task flush.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let Some(Accepted {
        id,
        mut outbound,
        cancel,
    }) = hub.accept().await
    else {
        tracing::debug!("Hub closed, dropping new WebSocket");
        return;
    };
    tracing::info!(conn_id = %id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel frames to the WebSocket sink. Ends once
    // the registry drops the connection's sender.
    let sender_id = id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = sink.send(msg).await {
                tracing::debug!(conn_id = %sender_id, error = %e, "WebSocket sink closed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    // Receiver loop.
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(conn_id = %id, "WebSocket closed by server");
                break;
            }
            next = stream.next() => match next {
                None => {
                    tracing::debug!(conn_id = %id, "WebSocket stream ended without close frame");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(conn_id = %id, error = %e, "WebSocket transport error");
                    break;
                }
                Some(Ok(msg)) => match InboundFrame::from(msg) {
                    InboundFrame::Pong => {
                        tracing::trace!(conn_id = %id, "Pong received");
                        hub.mark_responsive(&id).await;
                    }
                    InboundFrame::Close(Some(frame)) => {
                        tracing::info!(
                            conn_id = %id,
                            code = frame.code,
                            reason = frame.reason.as_str(),
                            "WebSocket closed by client"
                        );
                        break;
                    }
                    InboundFrame::Close(None) => {
                        tracing::info!(conn_id = %id, "WebSocket closed by client");
                        break;
                    }
                    InboundFrame::Ignored => {
                        tracing::trace!(conn_id = %id, "Ignoring inbound frame");
                    }
                },
            },
        }
    }

    // Eviction and shutdown already removed the entry; this is then a no-op.
    if let Some(conn) = hub.disconnect(&id).await {
        let session_secs = (chrono::Utc::now() - conn.connected_at()).num_seconds();
        tracing::debug!(conn_id = %id, session_secs, "Unregistered WebSocket connection");
    }

    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }
    tracing::info!(conn_id = %id, "WebSocket disconnected");
}
