use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{
    PlayerId,
    board::{Round, RoundGrid},
    session::{ClueAttempt, ScoreState},
    session_id::SessionId,
};

/// Frames accepted from player WebSocket clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// First frame of every connection; carries the id of a previous connection to resume it.
    Identification {
        #[serde(default)]
        player_id: Option<Uuid>,
    },
    /// Open a new session and become its owner.
    CreateSession { display_name: String },
    /// Enter an existing session.
    JoinSession {
        display_name: String,
        session_id: SessionId,
    },
    /// Leave the session.
    LeaveSession { session_id: SessionId },
    /// Owner starts the game.
    StartSession { session_id: SessionId },
    /// Turn holder picks a clue.
    ClueChosen {
        session_id: SessionId,
        clue_id: String,
    },
    /// Claim the floor on the active clue.
    BuzzIn { session_id: SessionId },
    /// Buzzed player answers; `null` counts as a wrong answer.
    SubmitAnswer {
        session_id: SessionId,
        #[serde(default)]
        answer_text: Option<String>,
    },
    /// Owner cycles a player's score state.
    OverrideScore {
        session_id: SessionId,
        player_id: PlayerId,
    },
    /// Owner moves on to the next clue.
    ClueCompleted { session_id: SessionId },
    /// Anything else.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreboardEntry {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Cumulative score.
    pub score: i32,
}

/// Frames pushed to player WebSocket clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Identification acknowledged.
    Connected { player_id: PlayerId },
    /// The actor's new session is open.
    SessionCreated { session_id: SessionId },
    /// Outcome of a join request.
    SessionJoined {
        session_id: SessionId,
        error: Option<String>,
        player_names: Vec<String>,
    },
    /// Lobby roster change; `reset` replaces the whole list.
    LobbyUpdate { names: Vec<String>, reset: bool },
    /// The owner started the game.
    SessionStarted,
    /// Board of the active round.
    BoardCreated { board: RoundGrid, round: Round },
    /// The recipient now chooses the next clue.
    TurnAssigned,
    /// Scores of every member; `reset` replaces the whole board.
    ScoreboardUpdate {
        players: Vec<ScoreboardEntry>,
        reset: bool,
    },
    /// Text of the chosen clue.
    ClueRevealed { question: String },
    /// Expected response to the active clue.
    AnswerRevealed { answer: String },
    /// Anyone who has not attempted may buzz for `timeout_ms`.
    BuzzWindowOpen { timeout_ms: u64 },
    /// The buzzed player's answer window started.
    PersonalTimerStarted { player_id: PlayerId },
    /// The buzzed player's answer window stopped.
    PersonalTimerStopped { player_id: PlayerId },
    /// Human-readable status line.
    StatusMessage { text: String },
    /// Automatic tally of the resolved clue.
    ScoringResult {
        players: IndexMap<PlayerId, ClueAttempt>,
    },
    /// Owner override applied to one attempt.
    ScoreCorrection {
        player_id: PlayerId,
        score_state: ScoreState,
        score: i32,
    },
    /// The recipient now owns the session.
    OwnershipGranted,
    /// Input-validation failure.
    ActionError { message: String },
    /// Both rounds are exhausted.
    GameOver { players: Vec<ScoreboardEntry> },
}

impl ServerMessage {
    /// Status line helper.
    pub fn status(text: impl Into<String>) -> Self {
        Self::StatusMessage { text: text.into() }
    }
}
