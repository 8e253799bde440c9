//! Wire format for frames exchanged on the notification endpoint.

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use serde::Serialize;

/// Outbound (server -> client) application frames.
///
/// Serialized as JSON text with a `type` discriminator:
///
/// ```json
/// {"type": "welcome"}
/// {"type": "match_created", "data": { ... }}
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent exactly once, immediately after a connection is accepted.
    Welcome,
    /// A new match was persisted by the write path.
    MatchCreated { data: serde_json::Value },
}

impl ServerMessage {
    /// Encode into a WebSocket text frame.
    ///
    /// The returned [`Message`] is cheap to clone (the payload is
    /// reference-counted), so a broadcast encodes once and clones per
    /// connection.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(Utf8Bytes::from(text)))
    }
}

/// Classification of an inbound frame as far as the hub cares.
#[derive(Debug)]
pub enum InboundFrame {
    /// Response to a heartbeat probe.
    Pong,
    /// Client-initiated close, with the optional code/reason.
    Close(Option<CloseFrame>),
    /// Anything else. Clients have no application-level messages to send.
    Ignored,
}

impl From<Message> for InboundFrame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Pong(_) => InboundFrame::Pong,
            Message::Close(frame) => InboundFrame::Close(frame),
            // Client pings are answered by the transport itself.
            Message::Ping(_) | Message::Text(_) | Message::Binary(_) => InboundFrame::Ignored,
        }
    }
}
