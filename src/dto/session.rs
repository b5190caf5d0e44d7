use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{format_system_time, phase::VisibleSessionStatus},
    state::{board::Round, registry::Players, session::Session},
};

/// Read-only view of a session returned by `GET /sessions/{id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: String,
    pub status: VisibleSessionStatus,
    /// Transitions applied to the session so far.
    pub version: usize,
    pub round: Round,
    pub created_at: String,
    pub owner_id: Uuid,
    pub turn_player_id: Uuid,
    pub answered_clues: usize,
    pub round_clues: usize,
    pub players: Vec<PlayerSummary>,
}

/// Public projection of a session member.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub score: i32,
    pub is_owner: bool,
    pub disconnected: bool,
}

impl SessionSummary {
    /// Project a session and its members.
    pub fn from_session(session: &Session, players: &Players) -> Self {
        let players = session
            .members
            .iter()
            .filter_map(|id| players.get(id))
            .map(|player| PlayerSummary {
                id: player.id,
                name: player.display_name().to_string(),
                score: player.score,
                is_owner: player.id == session.owner_id,
                disconnected: player.disconnected,
            })
            .collect();

        let snapshot = session.machine.snapshot();
        Self {
            id: session.id.to_string(),
            status: snapshot.status.into(),
            version: snapshot.version,
            round: session.round,
            created_at: format_system_time(session.created_at),
            owner_id: session.owner_id,
            turn_player_id: session.turn_player_id,
            answered_clues: session.answered_count,
            round_clues: session.board.round_size(session.round),
            players,
        }
    }
}
