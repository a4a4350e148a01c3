//! Persistent notification connections
//!
//! Clients identify themselves once per connection as a customer (by
//! identity) or an agent (by identifier); after that the server pushes
//! notification events and acknowledges every inbound message. Malformed
//! payloads get a typed error acknowledgment, never a close.

use super::state::AppState;
use crate::notify::{NotificationHub, TargetKind};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

/// First message a client must send after the upgrade
#[derive(Debug, Deserialize)]
struct Hello {
    /// "customer" or "agent"
    role: TargetKind,
    /// Customer identity or agent identifier
    id: String,
}

/// GET /ws/notifications
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // The connection stays anonymous until a well-formed hello arrives;
    // malformed attempts are answered, not dropped.
    let hello = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<Hello>(&text) {
                Ok(hello) => {
                    let ack = json!({"type": "ack", "event": "hello"}).to_string();
                    if socket.send(Message::Text(ack)).await.is_err() {
                        return;
                    }
                    break hello;
                }
                Err(e) => {
                    let err = json!({
                        "type": "error",
                        "error": format!("expected hello with role and id: {}", e),
                    })
                    .to_string();
                    if socket.send(Message::Text(err)).await.is_err() {
                        return;
                    }
                }
            },
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(_)) => return,
        }
    };

    info!("Notification connection opened for {:?} {}", hello.role, hello.id);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    // Guard unregisters on drop, so a cancelled connection task still
    // releases its registry slot.
    let _guard =
        NotificationHub::register(&state.center.hub, hello.role, &hello.id, tx.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Everything outbound (notifications and acks) funnels through one
    // channel so the sink has a single writer.
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let ack_tx = tx;
    let mut recv_task = tokio::spawn(async move {
        while let Some(inbound) = stream.next().await {
            match inbound {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<serde_json::Value>(&text) {
                        Ok(_) => json!({"type": "ack"}).to_string(),
                        Err(e) => json!({
                            "type": "error",
                            "error": format!("malformed payload: {}", e),
                        })
                        .to_string(),
                    };
                    if ack_tx.send(reply).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    // Either side ending tears the whole connection down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Notification connection closed for {:?} {}", hello.role, hello.id);
}
