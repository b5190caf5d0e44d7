use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Live sessions, absent when the engine did not answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<usize>,
    /// Registered players, absent when the engine did not answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<usize>,
}

impl HealthResponse {
    /// Create a health response indicating the engine is operational.
    pub fn ok(sessions: usize, players: usize) -> Self {
        Self {
            status: "ok".to_string(),
            sessions: Some(sessions),
            players: Some(players),
        }
    }

    /// Whether the engine answered the probe.
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }

    /// Create a health response indicating the engine did not answer.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            sessions: None,
            players: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_payload_omits_counters() {
        let value = serde_json::to_value(HealthResponse::degraded()).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "degraded" }));
        assert!(HealthResponse::ok(2, 5).is_healthy());
    }
}
