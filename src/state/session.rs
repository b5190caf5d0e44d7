use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{
    PlayerId,
    board::{Board, Round},
    session_id::SessionId,
    state_machine::{SessionStateMachine, SessionStatus},
    timeout::{SessionTimer, Timeout, TimerToken},
};

/// A connected (or briefly disconnected) participant.
#[derive(Debug)]
pub struct Player {
    /// Stable identifier, reusable on reconnect.
    pub id: PlayerId,
    /// Display name, set when creating or joining a session.
    pub name: Option<String>,
    /// Whether the player owns the session they are in.
    pub is_owner: bool,
    /// Session the player currently belongs to.
    pub session_id: Option<SessionId>,
    /// Cumulative score within the current session.
    pub score: i32,
    /// Whether the socket dropped and the grace period is running.
    pub disconnected: bool,
    /// Pending removal after a disconnect.
    pub grace_timeout: Option<Timeout>,
}

impl Player {
    /// Register a fresh player outside of any session.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            name: None,
            is_owner: false,
            session_id: None,
            score: 0,
            disconnected: false,
            grace_timeout: None,
        }
    }

    /// Name shown to other players, empty if none was chosen yet.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// How a player's attempt on the current clue ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The player buzzed and has not answered yet.
    Pending,
    /// Graded correct.
    Correct,
    /// Graded incorrect, or submitted nothing.
    Uncertain,
    /// The answer window elapsed.
    Timeout,
}

/// Scoring verdict shown during confirmation, cycled by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoreState {
    /// The clue value was deducted.
    Negative,
    /// Neither gained nor lost.
    Neutral,
    /// The clue value was awarded.
    Positive,
}

/// A player's attempt on the active clue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClueAttempt {
    /// Display name at the time of the buzz.
    pub name: String,
    /// How the attempt ended.
    pub outcome: Outcome,
    /// Running score after the latest adjustment.
    pub score: i32,
    /// Verdict, set once the clue is resolved.
    pub score_state: Option<ScoreState>,
}

/// One running game and everything needed to arbitrate it.
#[derive(Debug)]
pub struct Session {
    /// Shareable identifier.
    pub id: SessionId,
    /// Player allowed to start, override and continue.
    pub owner_id: PlayerId,
    /// Status and transition table.
    pub machine: SessionStateMachine,
    /// Round being played.
    pub round: Round,
    /// Clues revealed in the current round.
    pub answered_count: usize,
    /// Player choosing the next clue.
    pub turn_player_id: PlayerId,
    /// Player who takes control at the next board emission.
    pub pending_turn_player_id: Option<PlayerId>,
    /// Player currently holding the floor.
    pub buzzed_player_id: Option<PlayerId>,
    /// Attempts on the active clue, in buzz order.
    pub attempts: IndexMap<PlayerId, ClueAttempt>,
    /// Clue being played.
    pub current_clue_id: Option<String>,
    /// Value of the clue being played, round multiplier included.
    pub current_clue_value: Option<i32>,
    /// Boards of both rounds.
    pub board: Board,
    /// Members in join order.
    pub members: IndexSet<PlayerId>,
    /// Anyone-may-buzz window.
    pub buzz_timeout: Option<Timeout>,
    /// Buzzed player's answer window.
    pub answer_timeout: Option<Timeout>,
    /// Pause before a follow-up buzz window.
    pub reopen_timeout: Option<Timeout>,
    /// Creation instant.
    pub created_at: SystemTime,
}

impl Session {
    /// Open a lobby owned by `owner_id`.
    pub fn new(id: SessionId, owner_id: PlayerId) -> Self {
        let mut members = IndexSet::new();
        members.insert(owner_id);
        Self {
            id,
            owner_id,
            machine: SessionStateMachine::new(),
            round: Round::Round1,
            answered_count: 0,
            turn_player_id: owner_id,
            pending_turn_player_id: None,
            buzzed_player_id: None,
            attempts: IndexMap::new(),
            current_clue_id: None,
            current_clue_value: None,
            board: Board::default(),
            members,
            buzz_timeout: None,
            answer_timeout: None,
            reopen_timeout: None,
            created_at: SystemTime::now(),
        }
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.machine.status()
    }

    /// Whether `player_id` belongs to the session.
    pub fn is_member(&self, player_id: &PlayerId) -> bool {
        self.members.contains(player_id)
    }

    /// Whether every current member already attempted the active clue.
    pub fn everyone_attempted(&self) -> bool {
        self.members
            .iter()
            .all(|member| self.attempts.contains_key(member))
    }

    fn slot(&mut self, timer: SessionTimer) -> &mut Option<Timeout> {
        match timer {
            SessionTimer::BuzzWindow => &mut self.buzz_timeout,
            SessionTimer::AnswerWindow => &mut self.answer_timeout,
            SessionTimer::ReopenDelay => &mut self.reopen_timeout,
        }
    }

    /// Store `timeout` for `timer`, cancelling whatever it replaces.
    pub fn arm(&mut self, timer: SessionTimer, timeout: Timeout) {
        if let Some(previous) = self.slot(timer).replace(timeout) {
            previous.cancel();
        }
    }

    /// Cancel and drop the timeout held for `timer`.
    pub fn disarm(&mut self, timer: SessionTimer) {
        if let Some(timeout) = self.slot(timer).take() {
            timeout.cancel();
        }
    }

    /// Release the slot for `timer` if it still holds the timeout identified by `token`.
    ///
    /// Returns `false` for stale firings.
    pub fn take_timeout(&mut self, timer: SessionTimer, token: TimerToken) -> bool {
        let slot = self.slot(timer);
        if slot.as_ref().is_some_and(|timeout| timeout.token() == token) {
            slot.take();
            true
        } else {
            false
        }
    }

    /// Cancel every timeout bound to the active clue.
    pub fn cancel_timeouts(&mut self) {
        for timer in [
            SessionTimer::BuzzWindow,
            SessionTimer::AnswerWindow,
            SessionTimer::ReopenDelay,
        ] {
            self.disarm(timer);
        }
    }
}
