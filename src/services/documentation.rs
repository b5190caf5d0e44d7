use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Clueboard Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::get_session,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::SessionSummary,
            crate::dto::session::PlayerSummary,
            crate::dto::phase::VisibleSessionStatus,
            crate::state::board::Round,
            crate::state::session::Outcome,
            crate::state::session::ScoreState,
            crate::state::session::ClueAttempt,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Read-only session inspection"),
        (name = "players", description = "WebSocket protocol for players"),
    )
)]
pub struct ApiDoc;
