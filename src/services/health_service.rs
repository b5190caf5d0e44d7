use tracing::warn;

use crate::{
    dto::health::HealthResponse,
    services::engine::{Command, EngineStats},
    state::SharedState,
};

/// Ask the engine for its counters; an unresponsive engine reports degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.query(|reply| Command::Stats { reply }).await {
        Ok(EngineStats { sessions, players }) => HealthResponse::ok(sessions, players),
        Err(err) => {
            warn!(error = %err, "engine did not answer the health probe");
            HealthResponse::degraded()
        }
    }
}
