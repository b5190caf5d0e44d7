use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::session::SessionSummary, error::AppError, services::session_service, state::SharedState,
};

/// Read-only session endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sessions/{session_id}", get(get_session))
}

#[utoipa::path(
    get,
    path = "/sessions/{session_id}",
    tag = "sessions",
    params(("session_id" = String, Path, description = "Six-character session id, case-insensitive")),
    responses(
        (status = 200, description = "Session summary", body = SessionSummary),
        (status = 404, description = "No such session"),
        (status = 503, description = "Engine unavailable")
    )
)]
/// Return the status, round and scoreboard of one session.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let payload = session_service::get_session(&state, &session_id).await?;
    Ok(Json(payload))
}
