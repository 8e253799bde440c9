#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use livescore_api::config::{HubConfig, ServerConfig};
use livescore_api::router::build_app_router;
use livescore_api::state::AppState;
use livescore_api::ws::BroadcastHub;

/// Hub settings for tests that drive sweeps by hand: the timer never fires
/// during a test run.
pub fn manual_hub_config() -> HubConfig {
    HubConfig {
        heartbeat_interval: Duration::from_secs(3600),
        ..HubConfig::default()
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(hub: HubConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".parse().unwrap()],
        hub,
    }
}

/// Build the full application router around a freshly started hub.
pub fn build_test_app(hub_config: HubConfig) -> (Router, Arc<BroadcastHub>) {
    let config = test_config(hub_config);
    let hub = BroadcastHub::start(config.hub.clone()).expect("hub starts");
    let state = AppState {
        config: Arc::new(config.clone()),
        hub: Arc::clone(&hub),
    };
    let app = build_app_router(state, &config).expect("router builds");
    (app, hub)
}

/// Serve the application on an ephemeral localhost port.
pub async fn spawn_server(hub_config: HubConfig) -> (SocketAddr, Arc<BroadcastHub>) {
    let (app, hub) = build_test_app(hub_config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hub)
}

/// Send a GET request through the router without a network socket.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Parse a server text frame as JSON, panicking on any other frame kind.
pub fn frame_json(msg: Message) -> serde_json::Value {
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Poll until the hub reports `expected` connections, or fail after 5s.
pub async fn wait_for_count(hub: &BroadcastHub, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let count = hub.connection_count().await;
        if count == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {expected} connections, still have {count}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
