//! Real server fixtures
//!
//! Binds the full router on `127.0.0.1:0` with a JWT identity resolver and
//! an in-memory directory, and speaks to it with `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use taskcollab::backend::auth::identity::JwtIdentityResolver;
use taskcollab::backend::auth::sessions::create_token;
use taskcollab::backend::directory::InMemoryDirectory;
use taskcollab::backend::routes::create_router;
use taskcollab::backend::server::{build_state, AppState};
use taskcollab::shared::{RealtimeConfig, UserId};

use super::hub::{OTHER_PROJECT, OTHER_TASK, PROJECT, TASK};

pub const TEST_SECRET: &str = "integration-test-secret";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn test_state() -> AppState {
    let config = RealtimeConfig::builder()
        .jwt_secret(TEST_SECRET)
        .outbound_buffer(64)
        .notification_queue_capacity(64)
        .build()
        .expect("test config is valid");
    let directory = InMemoryDirectory::new()
        .with_project(PROJECT)
        .with_project(OTHER_PROJECT)
        .with_task(TASK)
        .with_task(OTHER_TASK);
    build_state(
        config,
        Arc::new(JwtIdentityResolver::new(TEST_SECRET)),
        Arc::new(directory),
    )
}

/// Serve the full router on an ephemeral port
pub async fn spawn_server() -> (SocketAddr, AppState) {
    let state = test_state();
    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    (addr, state)
}

pub fn jwt_for(user_id: UserId) -> String {
    create_token(user_id, None, TEST_SECRET, 3600).expect("create test token")
}

pub async fn connect_ws(addr: SocketAddr, token: Option<&str>) -> WsClient {
    let url = match token {
        Some(token) => format!("ws://{}/ws?token={}", addr, token),
        None => format!("ws://{}/ws", addr),
    };
    let (ws, _response) = connect_async(url).await.expect("websocket handshake");
    ws
}

/// What the client saw next: a JSON envelope or a close frame
#[derive(Debug)]
pub enum Received {
    Json(Value),
    Close(Option<u16>),
}

pub async fn next_frame(ws: &mut WsClient) -> Received {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Text(text))) => {
                return Received::Json(serde_json::from_str(text.as_str()).expect("server sent JSON"))
            }
            Some(Ok(Message::Close(frame))) => {
                return Received::Close(frame.map(|f: CloseFrame| u16::from(f.code)))
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return Received::Close(None),
        }
    }
}

/// Next JSON envelope, failing on a close
pub async fn next_json(ws: &mut WsClient) -> Value {
    match next_frame(ws).await {
        Received::Json(value) => value,
        Received::Close(code) => panic!("expected a JSON frame, got close {:?}", code),
    }
}

/// Skip envelopes until one of `kind` arrives
pub async fn expect_type(ws: &mut WsClient, kind: &str) -> Value {
    loop {
        let value = next_json(ws).await;
        if value["type"] == kind {
            return value;
        }
    }
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("send frame");
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    send_text(ws, &value.to_string()).await;
}

/// Poll until `check` passes or a second elapses
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
