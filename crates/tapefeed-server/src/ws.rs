//! WebSocket handler for the real-time dashboard feed.
//!
//! Clients connect to `GET /ws` and receive every envelope the
//! distribution service broadcasts. Each connection owns a bounded outbound
//! queue registered with the [`ClientRegistry`]; if the queue saturates or
//! the socket write fails, the registry sweeps the connection on its next
//! broadcast. Inbound traffic beyond liveness frames is ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::AppState;

/// Outbound queue depth per connection. A client that falls this far
/// behind is treated as failed and dropped.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Upgrade an HTTP request to a WebSocket connection and attach it to the
/// broadcast feed.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the WebSocket lifecycle: register with the fan-out registry,
/// pump queued envelopes to the socket, and unregister on disconnect.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_DEPTH);
    let connection_id = state.registry.register(tx).await;
    debug!(%connection_id, "dashboard client connected");

    loop {
        tokio::select! {
            // An envelope broadcast by the distribution service.
            outbound = rx.recv() => {
                match outbound {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            debug!(%connection_id, "client disconnected (send failed)");
                            break;
                        }
                    }
                    // Sender dropped: the registry swept this connection.
                    None => break,
                }
            }
            // Liveness traffic from the client.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection_id, "client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection_id, "client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%connection_id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore text/binary frames from the client.
                    }
                }
            }
        }
    }

    state.registry.unregister(connection_id).await;
}
