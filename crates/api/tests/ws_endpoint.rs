//! End-to-end tests over a real WebSocket connection.
//!
//! The server runs on an ephemeral localhost port and clients connect with
//! `tokio-tungstenite`, so handshake limits, ping/pong and close handling
//! are exercised through the actual transport.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as ClientMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::{manual_hub_config, spawn_server, wait_for_count};
use livescore_api::config::HubConfig;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("handshake succeeds");
    client
}

/// Read the next application text frame, skipping control frames.
async fn next_json(client: &mut Client) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(READ_TIMEOUT, client.next())
            .await
            .expect("frame arrives in time")
            .expect("stream still open")
            .expect("frame is valid");
        match msg {
            ClientMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            ClientMessage::Ping(_) | ClientMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Read until the server closes the connection.
async fn expect_server_close(client: &mut Client) {
    loop {
        let next = tokio::time::timeout(READ_TIMEOUT, client.next())
            .await
            .expect("server closes in time");
        match next {
            None | Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) => return,
            Some(Ok(_)) => continue,
        }
    }
}

// ---------------------------------------------------------------------------
// Test: a client gets the welcome frame, then published matches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_receives_welcome_then_match_created() {
    let (addr, hub) = spawn_server(manual_hub_config()).await;
    let mut client = connect(addr, "/ws").await;

    assert_eq!(next_json(&mut client).await, json!({"type": "welcome"}));
    wait_for_count(&hub, 1).await;

    let payload = json!({"id": 3, "sport": "cricket", "homeTeam": "A", "awayTeam": "B"});
    assert_eq!(hub.publish(&payload).await.unwrap(), 1);

    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "match_created", "data": payload})
    );
}

// ---------------------------------------------------------------------------
// Test: every connected client receives each broadcast, in order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_all_clients_in_order() {
    let (addr, hub) = spawn_server(manual_hub_config()).await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        let mut client = connect(addr, "/ws").await;
        assert_eq!(next_json(&mut client).await["type"], "welcome");
        clients.push(client);
    }
    wait_for_count(&hub, 3).await;

    hub.publish(&json!({"id": 1})).await.unwrap();
    hub.publish(&json!({"id": 2})).await.unwrap();

    for client in &mut clients {
        assert_eq!(next_json(client).await["data"]["id"], 1);
        assert_eq!(next_json(client).await["data"]["id"], 2);
    }
}

// ---------------------------------------------------------------------------
// Test: a client-initiated close unregisters the connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_close_unregisters_connection() {
    let (addr, hub) = spawn_server(manual_hub_config()).await;
    let mut leaving = connect(addr, "/ws").await;
    let mut staying = connect(addr, "/ws").await;
    next_json(&mut leaving).await;
    next_json(&mut staying).await;
    wait_for_count(&hub, 2).await;

    leaving.close(None).await.unwrap();
    wait_for_count(&hub, 1).await;

    assert_eq!(hub.publish(&json!({"id": 5})).await.unwrap(), 1);
    assert_eq!(next_json(&mut staying).await["data"]["id"], 5);
}

// ---------------------------------------------------------------------------
// Test: oversized inbound frames drop only the offending connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_frame_closes_only_that_connection() {
    let (addr, hub) = spawn_server(HubConfig {
        max_frame_bytes: 1024,
        ..manual_hub_config()
    })
    .await;
    let mut offender = connect(addr, "/ws").await;
    let mut bystander = connect(addr, "/ws").await;
    next_json(&mut offender).await;
    next_json(&mut bystander).await;
    wait_for_count(&hub, 2).await;

    offender
        .send(ClientMessage::Text("x".repeat(4096)))
        .await
        .unwrap();
    wait_for_count(&hub, 1).await;

    assert_eq!(hub.publish(&json!({"id": 8})).await.unwrap(), 1);
    assert_eq!(next_json(&mut bystander).await["data"]["id"], 8);
}

// ---------------------------------------------------------------------------
// Test: heartbeat evicts a client that never answers pings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heartbeat_evicts_silent_client_and_keeps_responsive_one() {
    let (addr, hub) = spawn_server(HubConfig {
        heartbeat_interval: Duration::from_millis(100),
        ..HubConfig::default()
    })
    .await;

    // Responsive client: keeps reading, so tungstenite answers every Ping.
    let mut responsive = connect(addr, "/ws").await;
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(Ok(msg)) = responsive.next().await {
            if let ClientMessage::Text(text) = msg {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if frames_tx.send(value).is_err() {
                    break;
                }
            }
        }
    });

    // Silent client: reads the welcome, then never polls again.
    let mut silent = connect(addr, "/ws").await;
    next_json(&mut silent).await;

    wait_for_count(&hub, 2).await;
    // Several heartbeat periods pass; only the silent client is evicted.
    tokio::time::sleep(Duration::from_millis(500)).await;
    wait_for_count(&hub, 1).await;

    assert_eq!(hub.publish(&json!({"id": 13})).await.unwrap(), 1);

    let welcome = frames_rx.recv().await.unwrap();
    assert_eq!(welcome["type"], "welcome");
    let frame = tokio::time::timeout(READ_TIMEOUT, frames_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame["data"]["id"], 13);

    drop(silent);
}

// ---------------------------------------------------------------------------
// Test: closing the hub closes connected clients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hub_close_disconnects_clients() {
    let (addr, hub) = spawn_server(manual_hub_config()).await;
    let mut client = connect(addr, "/ws").await;
    next_json(&mut client).await;
    wait_for_count(&hub, 1).await;

    hub.close().await;
    hub.close().await;

    expect_server_close(&mut client).await;
    assert_eq!(hub.connection_count().await, 0);
}
