use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionStatus;

/// Session status exposed to REST clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionStatus {
    /// Players are gathering.
    Lobby,
    /// Waiting for the turn holder to pick a clue.
    WaitingClue,
    /// A clue is shown and the buzz race is open.
    WaitingBuzz,
    /// A player holds the floor.
    PlayerBuzzed,
    /// Scores are being confirmed.
    Scoring,
    /// Both rounds are over.
    Finished,
}

impl From<SessionStatus> for VisibleSessionStatus {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::Lobby => VisibleSessionStatus::Lobby,
            SessionStatus::WaitingClue => VisibleSessionStatus::WaitingClue,
            SessionStatus::WaitingBuzz => VisibleSessionStatus::WaitingBuzz,
            SessionStatus::PlayerBuzzed => VisibleSessionStatus::PlayerBuzzed,
            SessionStatus::Scoring => VisibleSessionStatus::Scoring,
            SessionStatus::Finished => VisibleSessionStatus::Finished,
        }
    }
}
