use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
};

use crate::{services::websocket_service, state::SharedState};

/// Largest client frame accepted; answers and names are short.
const MAX_FRAME_BYTES: usize = 16 * 1024;

/// Player socket endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/ws", get(ws_handler))
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "players",
    responses((status = 101, description = "Switching protocols to the player WebSocket"))
)]
/// Upgrade to a player socket. The first frame must be `identification`.
pub async fn ws_handler(State(state): State<SharedState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| websocket_service::handle_socket(state, socket))
}
