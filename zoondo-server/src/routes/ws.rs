//! Game socket
//!
//! One writer task per connection drains the outbound channel; the reader
//! loop feeds text frames to the dispatcher until either side closes.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::dispatch::{self, Flow, Session};
use crate::state::{Outgoing, ServerState};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let player_id = format!("player-{:016x}", rand::random::<u64>());
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();

    state.connect(&player_id, tx.clone());
    tracing::debug!(player = %player_id, "Connection opened");

    let writer = tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            match outgoing {
                Outgoing::Message(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::error!(error = %err, "Failed to serialize server message");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut session = Session::new(player_id.clone(), tx);
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            // Pings are answered by axum; binary frames are ignored
            Ok(_) => continue,
        };
        if dispatch::handle_text(&state, &mut session, &text).await == Flow::Close {
            break;
        }
    }

    dispatch::disconnect(&state, &session).await;
    drop(session);
    let _ = writer.await;
    tracing::debug!(player = %player_id, "Connection closed");
}
