use axum::extract::ws::Message;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::ws::ServerMessage,
    services::{context::Outbox, websocket_service::send_message_to_websocket},
    state::PlayerId,
};

/// Registry of live player sockets keyed by player id.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    sockets: DashMap<PlayerId, mpsc::UnboundedSender<Message>>,
}

impl ConnectionHub {
    /// Attach a socket writer and return the id it speaks for.
    ///
    /// A requested id is honoured unless another live socket already uses it,
    /// in which case a fresh id is issued.
    pub fn register(
        &self,
        requested: Option<PlayerId>,
        tx: mpsc::UnboundedSender<Message>,
    ) -> PlayerId {
        if let Some(player_id) = requested
            && let Entry::Vacant(slot) = self.sockets.entry(player_id)
        {
            slot.insert(tx);
            return player_id;
        }
        let player_id = Uuid::new_v4();
        self.sockets.insert(player_id, tx);
        player_id
    }

    /// Detach the socket of `player_id`.
    pub fn remove(&self, player_id: &PlayerId) {
        self.sockets.remove(player_id);
    }

    /// Number of live sockets.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Whether no socket is attached.
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

impl Outbox for ConnectionHub {
    fn send(&self, player_id: &PlayerId, message: &ServerMessage) {
        let Some(tx) = self.sockets.get(player_id).map(|entry| entry.value().clone()) else {
            debug!(player_id = %player_id, "no live socket, frame dropped");
            return;
        };
        if send_message_to_websocket(&tx, message).is_err() {
            debug!(player_id = %player_id, "socket writer closed, frame dropped");
        }
    }
}
