use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::ClientMessage,
    services::engine::Command,
    state::SharedState,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures while pushing a frame to a socket writer.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Writer channel closed; the connection is going away.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one player WebSocket connection.
///
/// The first frame must be an `identification`; afterwards every text frame is
/// parsed and forwarded to the engine in arrival order.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let requested = match ClientMessage::from_json_str(&initial_message) {
        Ok(ClientMessage::Identification { player_id }) => player_id,
        Ok(_) => {
            warn!("first message was not identification");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse identification message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let player_id = state.connections().register(requested, outbound_tx.clone());
    if state.dispatch(Command::Connected { player_id }).is_err() {
        state.connections().remove(&player_id);
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    }
    info!(
        player_id = %player_id,
        resumed = requested == Some(player_id),
        "player socket identified"
    );

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(ClientMessage::Identification { .. }) => {
                    warn!(player_id = %player_id, "ignoring duplicate identification message");
                }
                Ok(message) => {
                    if state.dispatch(Command::Action { player_id, message }).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(player_id = %player_id, error = %err, "malformed client message dropped");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(player_id = %player_id, "player closed the socket");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player_id = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    // Queued before detaching so a reconnect under the same id is ordered after it.
    let _ = state.dispatch(Command::Disconnected { player_id });
    state.connections().remove(&player_id);
    info!(player_id = %player_id, "player socket closed");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; a closed writer is
/// reported as [`SocketError::ConnectionClosed`].
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), SocketError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SocketError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
