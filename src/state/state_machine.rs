use thiserror::Error;

/// Status of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Players are gathering; only the owner can start.
    Lobby,
    /// The turn holder must pick a clue.
    WaitingClue,
    /// A clue is shown and anyone who has not tried yet may buzz.
    WaitingBuzz,
    /// One player holds the floor and must answer.
    PlayerBuzzed,
    /// The clue is resolved and the owner confirms scores.
    Scoring,
    /// Both rounds are exhausted.
    Finished,
}

/// Events that can be applied to a session's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Owner starts the game from the lobby.
    Start,
    /// Turn holder picks a clue.
    ClueChosen,
    /// A player claims the floor.
    Buzz,
    /// The buzzed player submits an answer (grading decides what follows).
    AnswerSubmitted,
    /// The buzzed player failed; others may buzz again.
    ReopenBuzz,
    /// The clue is settled and scores are tallied.
    Resolve,
    /// Owner cycles a player's score state.
    OverrideScore,
    /// Owner moves on to the next clue.
    ClueCompleted,
    /// Owner moves on but no clue is left in the last round.
    GameOver,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the session was in when the invalid event was received.
    pub from: SessionStatus,
    /// The event that cannot be applied from this status.
    pub event: SessionEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current status.
    pub status: SessionStatus,
    /// Number of transitions applied so far.
    pub version: usize,
}

/// Per-session state machine implementing the clue flow.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    status: SessionStatus,
    version: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            status: SessionStatus::Lobby,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            version: self.version,
        }
    }

    /// Check that `event` is accepted from the current status without applying it.
    pub fn ensure(&self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        self.compute_transition(event)
    }

    /// Apply `event`, returning the new status.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.status = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionStatus, InvalidTransition> {
        use SessionEvent as E;
        use SessionStatus as S;

        let next = match (self.status, event) {
            (S::Lobby, E::Start) => S::WaitingClue,
            (S::WaitingClue, E::ClueChosen) => S::WaitingBuzz,
            (S::WaitingBuzz, E::Buzz) => S::PlayerBuzzed,
            (S::PlayerBuzzed, E::AnswerSubmitted) => S::PlayerBuzzed,
            (S::PlayerBuzzed, E::ReopenBuzz) => S::WaitingBuzz,
            (S::PlayerBuzzed | S::WaitingBuzz, E::Resolve) => S::Scoring,
            (S::Scoring, E::OverrideScore) => S::Scoring,
            (S::Scoring, E::ClueCompleted) => S::WaitingClue,
            (S::Scoring, E::GameOver) => S::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionStatus {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.status(), SessionStatus::Lobby);
    }

    #[test]
    fn full_clue_cycle() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionStatus::WaitingClue);
        assert_eq!(apply(&mut sm, SessionEvent::ClueChosen), SessionStatus::WaitingBuzz);
        assert_eq!(apply(&mut sm, SessionEvent::Buzz), SessionStatus::PlayerBuzzed);
        assert_eq!(
            apply(&mut sm, SessionEvent::AnswerSubmitted),
            SessionStatus::PlayerBuzzed
        );
        assert_eq!(apply(&mut sm, SessionEvent::ReopenBuzz), SessionStatus::WaitingBuzz);
        assert_eq!(apply(&mut sm, SessionEvent::Resolve), SessionStatus::Scoring);
        assert_eq!(apply(&mut sm, SessionEvent::OverrideScore), SessionStatus::Scoring);
        assert_eq!(
            apply(&mut sm, SessionEvent::ClueCompleted),
            SessionStatus::WaitingClue
        );
        assert_eq!(sm.snapshot().version, 8);
    }

    #[test]
    fn buzzed_player_can_resolve_directly() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::ClueChosen);
        apply(&mut sm, SessionEvent::Buzz);
        assert_eq!(apply(&mut sm, SessionEvent::Resolve), SessionStatus::Scoring);
        assert_eq!(apply(&mut sm, SessionEvent::GameOver), SessionStatus::Finished);
    }

    #[test]
    fn second_buzz_is_rejected() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::ClueChosen);
        apply(&mut sm, SessionEvent::Buzz);

        let err = sm.apply(SessionEvent::Buzz).unwrap_err();
        assert_eq!(err.from, SessionStatus::PlayerBuzzed);
        assert_eq!(err.event, SessionEvent::Buzz);
        assert_eq!(sm.status(), SessionStatus::PlayerBuzzed);
    }

    #[test]
    fn ensure_does_not_mutate() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.ensure(SessionEvent::Start), Ok(SessionStatus::WaitingClue));
        assert_eq!(sm.status(), SessionStatus::Lobby);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn finished_session_rejects_everything() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::ClueChosen);
        apply(&mut sm, SessionEvent::Resolve);
        apply(&mut sm, SessionEvent::GameOver);

        for event in [
            SessionEvent::Start,
            SessionEvent::ClueChosen,
            SessionEvent::Buzz,
            SessionEvent::ClueCompleted,
            SessionEvent::OverrideScore,
        ] {
            assert!(sm.ensure(event).is_err(), "{event:?} accepted after game over");
        }
    }
}
