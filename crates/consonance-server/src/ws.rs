//! `WebSocket` handler for the conversational surface.
//!
//! Each connection gets one reader loop (this handler) and one writer task
//! draining a bounded outbound queue. Everything sent to the client, from
//! any task, goes through that queue, so the socket has a single writer.
//!
//! Lifecycle: register (`Connecting`), queue `connection_established`,
//! mark `Open`, read until close or error, `Closing`, unregister.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use consonance_types::{ConnectionId, OutboundMessage};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::{Session, decode_binary, decode_text, dispatch};
use crate::error::TransportError;
use crate::hub::{Audience, BroadcastHub};
use crate::pipeline::ChatPipeline;
use crate::registry::{ConnectionHandle, Frame};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws` and `GET /ws/consciousness`
pub async fn ws_consciousness(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle one connection from registration to removal.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel(state.settings.outbound_buffer);

    let handle = state.registry.register(tx).await;
    let id = handle.id();
    info!(connection_id = %id, "WebSocket client connected");

    greet(&handle);
    state.registry.mark_open(id).await;

    let writer = tokio::spawn(write_frames(id, sink, rx));
    let heartbeat = state.settings.heartbeat_interval.map(|period| {
        spawn_heartbeat(
            id,
            period,
            Arc::clone(&state.pipeline),
            Arc::clone(&state.hub),
        )
    });

    let session = Session::new(id, state.settings.context_turns);

    while let Some(frame) = stream.next().await {
        let decoded = match frame {
            Ok(Message::Text(text)) => decode_text(text.as_str()),
            Ok(Message::Binary(bytes)) => decode_binary(&bytes),
            // Pings are answered by the protocol layer.
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!(connection_id = %id, "WebSocket client sent close");
                break;
            }
            Err(e) => {
                let err = TransportError::Read(e.to_string());
                debug!(connection_id = %id, error = %err, "WebSocket error");
                break;
            }
        };

        match decoded {
            Ok(message) => {
                debug!(connection_id = %id, kind = message.kind(), "inbound message");
                dispatch(&state, &session, message).await;
            }
            Err(e) => warn!(connection_id = %id, error = %e, "dropping malformed message"),
        }
    }

    state.registry.begin_close(id).await;
    if let Some(task) = heartbeat {
        task.abort();
    }
    state.registry.unregister(id).await;
    drop(handle);
    if let Err(e) = writer.await {
        debug!(connection_id = %id, error = %e, "writer task ended abnormally");
    }
    info!(connection_id = %id, "WebSocket client disconnected");
}

/// Queue the `connection_established` frame.
fn greet(handle: &ConnectionHandle) {
    let hello = OutboundMessage::ConnectionEstablished {
        connection_id: handle.id(),
        timestamp: Utc::now(),
    };
    match serde_json::to_string(&hello) {
        Ok(json) => {
            if handle.try_send(Frame::Text(json.into())).is_err() {
                warn!(connection_id = %handle.id(), "failed to queue connection_established");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize connection_established"),
    }
}

/// Drain the outbound queue into the socket until every sender is gone or a
/// write fails.
async fn write_frames(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = rx.recv().await {
        let Frame::Text(text) = frame;
        if let Err(e) = sink.send(Message::Text(text)).await {
            let err = TransportError::Write(e.to_string());
            debug!(connection_id = %id, error = %err, "WebSocket send failed");
            return;
        }
    }
    sink.close().await.ok();
}

/// Periodically send the latest snapshot to one connection.
fn spawn_heartbeat(
    id: ConnectionId,
    period: std::time::Duration,
    pipeline: Arc<ChatPipeline>,
    hub: Arc<BroadcastHub>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let update = OutboundMessage::ConsciousnessUpdate {
                metrics: pipeline.latest_snapshot().await,
                timestamp: Utc::now(),
            };
            hub.broadcast(&update, Audience::Only(id)).await;
        }
    })
}
