/**
 * WebSocket Session Loop
 *
 * Drives one client connection from upgrade to cleanup.
 *
 * # Lifecycle
 *
 * ```text
 * Accepted → Authenticating → Authenticated → Closed
 *                          ↘ Rejected → Closed
 * ```
 *
 * The socket is split in two. A writer task drains the connection's bounded
 * outbound queue onto the sink; the session task reads frames and hands text
 * to `handlers::handle_text`. The session never keeps its own sender, so
 * once the hub forgets the connection the queue closes and the writer ends,
 * which in turn ends the read loop.
 *
 * Cleanup (`RealtimeHub::disconnect`) runs exactly once when the loop exits.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::backend::middleware::auth::bearer_token;
use crate::backend::realtime::handlers::{handle_text, SessionContext};
use crate::backend::realtime::hub::{RealtimeHub, NORMAL_CLOSE_CODE};
use crate::backend::realtime::registry::{Outbound, OutboundReceiver};

/// How long the writer gets to flush after the read loop ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Authenticating,
    Authenticated,
    Rejected,
    Closed,
}

/// `GET /ws` - upgrade and run a session.
///
/// The token comes from `?token=` or, failing that, `Authorization: Bearer`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<RealtimeHub>>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Response {
    let token = params.token.or_else(|| bearer_token(&headers).map(str::to_string));
    ws.on_upgrade(move |socket| run_session(socket, hub, token))
}

struct Session {
    connection_id: uuid::Uuid,
    state: SessionState,
}

impl Session {
    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            "[Session] {} {:?} -> {:?}",
            self.connection_id,
            self.state,
            next
        );
        self.state = next;
    }
}

pub async fn run_session(socket: WebSocket, hub: Arc<RealtimeHub>, token: Option<String>) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = hub.channel();
    let connection_id = hub.connect(tx);
    let mut session = Session {
        connection_id,
        state: SessionState::Accepted,
    };

    let mut writer = tokio::spawn(write_outbound(sink, rx));

    session.transition(SessionState::Authenticating);
    let identity = match hub.authenticate(connection_id, token.as_deref()).await {
        Ok(identity) => identity,
        Err(_) => {
            session.transition(SessionState::Rejected);
            hub.disconnect(connection_id);
            // Let the writer flush auth_error and the close frame
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
                writer.abort();
            }
            session.transition(SessionState::Closed);
            return;
        }
    };
    session.transition(SessionState::Authenticated);

    let ctx = SessionContext {
        user_id: identity.user_id,
        connection_id,
    };

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&hub, ctx, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!("[Session] Ignoring binary frame on {}", connection_id);
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("[Session] Client closed {}", connection_id);
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("[Session] Receive error on {}: {}", connection_id, e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                tracing::debug!("[Session] Writer finished for {}", connection_id);
                break;
            }
        }
    }

    hub.disconnect(connection_id);
    if !writer.is_finished()
        && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err()
    {
        writer.abort();
    }
    session.transition(SessionState::Closed);
    tracing::info!(
        "[Session] Connection {} closed for user {}",
        connection_id,
        identity.user_id
    );
}

/// Drain the outbound queue onto the socket until the queue closes, a close
/// is requested, or the socket fails.
async fn write_outbound(mut sink: SplitSink<WebSocket, Message>, mut rx: OutboundReceiver) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Envelope(envelope) => {
                let json = match envelope.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("[Session] Failed to encode {}: {}", envelope.kind(), e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::debug!("[Session] Socket send failed, client disconnected");
                    return;
                }
            }
            Outbound::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                return;
            }
        }
    }

    // Queue closed: the hub dropped this connection
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: NORMAL_CLOSE_CODE,
            reason: "".into(),
        })))
        .await;
}
