//! Read-only projections of live sessions for the HTTP API.

use crate::{
    dto::session::SessionSummary,
    error::ServiceError,
    services::engine::Command,
    state::{SharedState, session_id::SessionId},
};

/// Summary of the session identified by `raw_id` (case-insensitive).
pub async fn get_session(state: &SharedState, raw_id: &str) -> Result<SessionSummary, ServiceError> {
    let session_id = SessionId::parse(raw_id);
    state
        .query(|reply| Command::Inspect {
            session_id: session_id.clone(),
            reply,
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}`")))
}
