use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    services::board_assembler::BoardError,
    state::{PlayerId, session_id::SessionId, state_machine::InvalidTransition},
};

/// Protocol violations: the action is dropped without mutating anything.
#[derive(Debug, Error)]
pub enum Rejection {
    /// No session with this id exists.
    #[error("unknown session `{0}`")]
    UnknownSession(SessionId),
    /// The actor is not a member of the addressed session.
    #[error("player is not a member of session `{0}`")]
    NotAMember(SessionId),
    /// The action is reserved to the session owner.
    #[error("only the session owner can do this")]
    NotOwner,
    /// Only the turn holder may choose a clue.
    #[error("player does not hold the turn")]
    NotTurnHolder,
    /// The clue is not on the board of the current round.
    #[error("unknown clue `{0}`")]
    UnknownClue(String),
    /// The clue was already revealed.
    #[error("clue `{0}` was already answered")]
    ClueAlreadyAnswered(String),
    /// Another player holds the floor.
    #[error("another player already buzzed in")]
    AlreadyBuzzed,
    /// The actor already had their chance on this clue.
    #[error("player already attempted this clue")]
    AlreadyAttempted,
    /// Only the buzzed player may answer.
    #[error("player is not the buzzed player")]
    NotBuzzedPlayer,
    /// No clue is being played.
    #[error("no clue is active")]
    NoActiveClue,
    /// The targeted player did not attempt the active clue.
    #[error("player `{0}` has no attempt on the active clue")]
    UnknownAttempt(PlayerId),
    /// The player is not registered.
    #[error("unknown player `{0}`")]
    UnknownPlayer(PlayerId),
    /// The action is not accepted in the session's current status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The board could not be assembled from the corpus.
    #[error("board assembly failed: {0}")]
    Board(#[from] BoardError),
}

/// Input-validation failures reported back to the actor.
///
/// The display text is shown to players as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// The chosen display name is not acceptable.
    #[error("{message}")]
    InvalidName {
        /// Machine-readable reason.
        code: String,
        /// Message shown to the player.
        message: String,
    },
    /// No session with this id exists.
    #[error("This game ID does not exist")]
    UnknownSession,
    /// Another member already uses this name.
    #[error("Someone in this game already has that name")]
    DuplicateName,
    /// The actor is already a member of this session.
    #[error("You are already in this game")]
    AlreadyJoined,
    /// The session is over and no longer accepts members.
    #[error("This game has already finished")]
    SessionFinished,
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The engine task is gone.
    #[error("engine unavailable")]
    Unavailable,
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable => AppError::ServiceUnavailable("engine stopped".into()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
