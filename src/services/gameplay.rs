//! Clue flow of a running session: board emission, buzz arbitration and the
//! timeout cascade that keeps a clue moving when players go quiet.

use tracing::{debug, error, info};

use crate::{
    dto::ws::ServerMessage,
    error::Rejection,
    services::{
        board_assembler::assemble_board,
        context::{Ctx, scoreboard},
        scoring::{is_correct, resolve_clue},
    },
    state::{
        PlayerId,
        board::Round,
        registry::Players,
        session::{ClueAttempt, Outcome, Session},
        state_machine::{SessionEvent, SessionStatus},
        timeout::{SessionTimer, TimerToken},
    },
};

/// Owner starts the game: assemble the board and hand control to the creator.
pub fn start_session(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    actor: PlayerId,
) -> Result<(), Rejection> {
    let is_owner = players.get(&actor).is_some_and(|player| player.is_owner);
    if !is_owner || session.owner_id != actor {
        return Err(Rejection::NotOwner);
    }
    session.machine.ensure(SessionEvent::Start)?;

    let board = assemble_board(
        ctx.corpus,
        ctx.config.categories_per_round,
        &mut rand::rng(),
    )
    .inspect_err(|err| error!(session_id = %session.id, error = %err, "cannot start session"))?;
    session.board = board;
    session.round = Round::Round1;
    session.answered_count = 0;
    session.turn_player_id = session.owner_id;
    info!(session_id = %session.id, members = session.members.len(), "session started");

    ctx.broadcast(session, ServerMessage::SessionStarted);
    ctx.broadcast_scoreboard(session, players, true);
    emit_board(ctx, session, players, SessionEvent::Start)
}

/// Publish the board of the active round and settle who holds control.
///
/// This is the only place where rounds advance and where the pending turn
/// holder is applied. `via` is the transition that leads back to
/// [`SessionStatus::WaitingClue`]; when the last round is exhausted the
/// session finishes instead.
pub fn emit_board(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    via: SessionEvent,
) -> Result<(), Rejection> {
    session.machine.ensure(via)?;
    let mut round_changed = false;
    if session.answered_count >= session.board.round_size(session.round) {
        if session.round != Round::Round1 {
            return finish_game(ctx, session, players);
        }
        session.round = Round::Round2;
        session.answered_count = 0;
        round_changed = true;
        if session.members.len() > 1 {
            session.pending_turn_player_id = lowest_scorer(session, players);
        }
        info!(session_id = %session.id, "round two begins");
    }

    ctx.broadcast(
        session,
        ServerMessage::BoardCreated {
            board: session.board.grid(session.round),
            round: session.round,
        },
    );

    let mut control_changed = false;
    if let Some(next) = session.pending_turn_player_id.take()
        && next != session.turn_player_id
        && session.is_member(&next)
    {
        session.turn_player_id = next;
        control_changed = true;
    }
    if !session.is_member(&session.turn_player_id)
        && let Some(first) = session.members.first().copied()
    {
        session.turn_player_id = first;
        control_changed = true;
    }

    let turn_player_id = session.turn_player_id;
    ctx.send(&turn_player_id, ServerMessage::TurnAssigned);
    let name = players.name(&turn_player_id);
    let text = match (session.members.len() > 1, round_changed, control_changed) {
        (true, true, _) => {
            format!("Welcome to Round 2, points are doubled. {name} now has Control of the Board!")
        }
        (true, false, true) => format!("{name} now has Control of the Board!"),
        (true, false, false) => format!("{name}'s turn!"),
        (false, true, _) => "Welcome to Round 2, points are doubled!".to_string(),
        (false, false, _) => "Choose a Clue".to_string(),
    };
    ctx.status(session, text);

    session.machine.apply(via)?;
    Ok(())
}

/// Member with the strictly lowest score; the first one wins ties.
fn lowest_scorer(session: &Session, players: &Players) -> Option<PlayerId> {
    session
        .members
        .iter()
        .copied()
        .reduce(|lowest, candidate| {
            if players.score(&candidate) < players.score(&lowest) {
                candidate
            } else {
                lowest
            }
        })
}

fn finish_game(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &Players,
) -> Result<(), Rejection> {
    session.machine.apply(SessionEvent::GameOver)?;
    session.cancel_timeouts();
    session.pending_turn_player_id = None;
    info!(session_id = %session.id, "game over");
    ctx.broadcast(
        session,
        ServerMessage::GameOver {
            players: scoreboard(session, players),
        },
    );
    Ok(())
}

/// Turn holder reveals a clue and opens the buzz race.
pub fn choose_clue(
    ctx: &Ctx<'_>,
    session: &mut Session,
    actor: PlayerId,
    clue_id: &str,
) -> Result<(), Rejection> {
    if session.turn_player_id != actor {
        return Err(Rejection::NotTurnHolder);
    }
    session.machine.ensure(SessionEvent::ClueChosen)?;
    let record = session
        .board
        .clue(clue_id)
        .filter(|record| record.slot.round == session.round)
        .ok_or_else(|| Rejection::UnknownClue(clue_id.to_string()))?;
    if record.answered {
        return Err(Rejection::ClueAlreadyAnswered(clue_id.to_string()));
    }

    let record = session
        .board
        .mark_answered(clue_id)
        .ok_or_else(|| Rejection::UnknownClue(clue_id.to_string()))?;
    let question = record.question.clone();
    let face_value = i32::try_from(record.value).unwrap_or(i32::MAX);
    session.answered_count += 1;
    session.current_clue_id = Some(clue_id.to_string());
    session.current_clue_value = Some(face_value.saturating_mul(session.round.value_multiplier()));
    session.attempts.clear();
    session.buzzed_player_id = None;
    session.machine.apply(SessionEvent::ClueChosen)?;
    debug!(
        session_id = %session.id,
        clue_id,
        value = ?session.current_clue_value,
        "clue chosen"
    );

    let window = ctx.config.timings.buzz_window;
    ctx.arm(session, SessionTimer::BuzzWindow, window);
    ctx.broadcast(session, ServerMessage::ClueRevealed { question });
    ctx.broadcast(
        session,
        ServerMessage::BuzzWindowOpen {
            timeout_ms: window.as_millis() as u64,
        },
    );
    Ok(())
}

/// A player claims the floor. The first accepted buzz wins.
pub fn buzz_in(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    actor: PlayerId,
) -> Result<(), Rejection> {
    if session.buzzed_player_id.is_some() {
        return Err(Rejection::AlreadyBuzzed);
    }
    if session.attempts.contains_key(&actor) {
        return Err(Rejection::AlreadyAttempted);
    }
    session.machine.apply(SessionEvent::Buzz)?;

    session.buzzed_player_id = Some(actor);
    session.disarm(SessionTimer::BuzzWindow);
    session.disarm(SessionTimer::ReopenDelay);
    let name = players.name(&actor);
    session.attempts.insert(
        actor,
        ClueAttempt {
            name: name.clone(),
            outcome: Outcome::Pending,
            score: players.score(&actor),
            score_state: None,
        },
    );
    debug!(session_id = %session.id, player_id = %actor, "buzz accepted");

    ctx.arm(
        session,
        SessionTimer::AnswerWindow,
        ctx.config.timings.answer_window,
    );
    ctx.broadcast(
        session,
        ServerMessage::PersonalTimerStarted { player_id: actor },
    );
    ctx.status(session, format!("{name} just buzzed in!"));
    Ok(())
}

/// Buzzed player answers; a missing or empty answer counts as wrong.
pub fn submit_answer(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    actor: PlayerId,
    answer_text: Option<&str>,
) -> Result<(), Rejection> {
    session.machine.ensure(SessionEvent::AnswerSubmitted)?;
    if session.buzzed_player_id != Some(actor) {
        return Err(Rejection::NotBuzzedPlayer);
    }
    let expected = session
        .current_clue_id
        .as_deref()
        .and_then(|id| session.board.clue(id))
        .map(|record| record.answer.clone())
        .ok_or(Rejection::NoActiveClue)?;
    session.machine.apply(SessionEvent::AnswerSubmitted)?;

    ctx.broadcast(
        session,
        ServerMessage::PersonalTimerStopped { player_id: actor },
    );
    session.disarm(SessionTimer::AnswerWindow);

    let name = players.name(&actor);
    let correct = answer_text.is_some_and(|text| is_correct(text, &expected));
    debug!(session_id = %session.id, player_id = %actor, correct, "answer graded");
    if correct {
        ctx.status(session, format!("{name} Answered Correctly!"));
        set_outcome(session, &actor, Outcome::Correct);
        reveal_answer(ctx, session);
        resolve_clue(ctx, session, players)
    } else {
        ctx.status(session, format!("{name} Finished Answering!"));
        set_outcome(session, &actor, Outcome::Uncertain);
        reopen_buzz_race(ctx, session, players)
    }
}

fn set_outcome(session: &mut Session, player_id: &PlayerId, outcome: Outcome) {
    if let Some(attempt) = session.attempts.get_mut(player_id) {
        attempt.outcome = outcome;
    }
}

/// Give the remaining members another chance, or settle the clue when nobody is left.
pub fn reopen_buzz_race(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
) -> Result<(), Rejection> {
    session.buzzed_player_id = None;
    if session.everyone_attempted() {
        reveal_answer(ctx, session);
        return resolve_clue(ctx, session, players);
    }
    session.machine.apply(SessionEvent::ReopenBuzz)?;
    ctx.arm(
        session,
        SessionTimer::ReopenDelay,
        ctx.config.timings.reopen_delay,
    );
    Ok(())
}

/// Show everyone the expected response of the active clue.
pub fn reveal_answer(ctx: &Ctx<'_>, session: &Session) {
    let Some(answer) = session
        .current_clue_id
        .as_deref()
        .and_then(|id| session.board.clue(id))
        .map(|record| record.answer.clone())
    else {
        return;
    };
    ctx.broadcast(session, ServerMessage::AnswerRevealed { answer });
}

/// Owner moves on once scores are confirmed.
pub fn clue_completed(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    actor: PlayerId,
) -> Result<(), Rejection> {
    if session.owner_id != actor {
        return Err(Rejection::NotOwner);
    }
    if session.current_clue_id.is_none() {
        return Err(Rejection::NoActiveClue);
    }
    session.machine.ensure(SessionEvent::ClueCompleted)?;

    session.current_clue_id = None;
    session.current_clue_value = None;
    session.attempts.clear();
    ctx.broadcast_scoreboard(session, players, true);
    emit_board(ctx, session, players, SessionEvent::ClueCompleted)
}

/// Handle an elapsed session timeout.
///
/// Firings whose token no longer matches the armed timeout, or that arrive in
/// a status the timeout was not meant for, are ignored.
pub fn on_timer(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    timer: SessionTimer,
    token: TimerToken,
) -> Result<(), Rejection> {
    if !session.take_timeout(timer, token) {
        debug!(session_id = %session.id, ?timer, token, "stale timeout ignored");
        return Ok(());
    }

    match (timer, session.status()) {
        (SessionTimer::BuzzWindow, SessionStatus::WaitingBuzz) => {
            debug!(session_id = %session.id, "buzz window elapsed");
            reveal_answer(ctx, session);
            resolve_clue(ctx, session, players)
        }
        (SessionTimer::AnswerWindow, SessionStatus::PlayerBuzzed) => {
            let Some(buzzed) = session.buzzed_player_id else {
                return Ok(());
            };
            set_outcome(session, &buzzed, Outcome::Timeout);
            ctx.status(
                session,
                format!("Time is up for {}!", players.name(&buzzed)),
            );
            reopen_buzz_race(ctx, session, players)
        }
        (SessionTimer::ReopenDelay, SessionStatus::WaitingBuzz) => {
            let window = ctx.config.timings.follow_up_window;
            ctx.broadcast(
                session,
                ServerMessage::BuzzWindowOpen {
                    timeout_ms: window.as_millis() as u64,
                },
            );
            ctx.arm(session, SessionTimer::BuzzWindow, window);
            Ok(())
        }
        (timer, status) => {
            debug!(session_id = %session.id, ?timer, ?status, "timeout fired in unexpected status");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{dto::ws::ClientMessage, services::test_support::Harness};

    #[test]
    fn start_emits_board_and_gives_control_to_creator() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::WaitingClue);
        assert_eq!(session.round, Round::Round1);
        assert_eq!(session.turn_player_id, players[0]);

        let frames = harness.frames(players[0]);
        assert!(frames.contains(&ServerMessage::SessionStarted));
        assert!(frames.contains(&ServerMessage::TurnAssigned));
        assert!(frames.contains(&ServerMessage::status("Ada's turn!")));
        assert!(
            frames
                .iter()
                .any(|frame| matches!(frame, ServerMessage::BoardCreated { round: Round::Round1, board } if board.len() == 2))
        );
        assert!(!harness.frames(players[1]).contains(&ServerMessage::TurnAssigned));
    }

    #[test]
    fn only_the_owner_can_start() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.lobby(&["Ada", "Bob"]);
        harness.act(
            players[1],
            ClientMessage::StartSession {
                session_id: session_id.clone(),
            },
        );
        assert_eq!(harness.session(&session_id).status(), SessionStatus::Lobby);
    }

    #[test]
    fn choosing_marks_both_records_and_opens_buzz_window() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let clue = harness.open_clue(&session_id);

        harness.act(
            players[1],
            ClientMessage::ClueChosen {
                session_id: session_id.clone(),
                clue_id: clue.clone(),
            },
        );
        assert_eq!(
            harness.session(&session_id).status(),
            SessionStatus::WaitingClue
        );

        harness.clear_frames();
        harness.choose(players[0], &session_id, &clue);
        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::WaitingBuzz);
        assert_eq!(session.answered_count, 1);
        assert!(session.board.clue(&clue).unwrap().answered);
        assert!(session.board.is_consistent(&clue));
        assert_eq!(
            harness.scheduled(SessionTimer::BuzzWindow),
            vec![Duration::from_secs(10)]
        );
        assert!(harness.frames(players[1]).contains(&ServerMessage::BuzzWindowOpen {
            timeout_ms: 10_000
        }));

        harness.fire_buzz_window();
        harness.act(
            players[0],
            ClientMessage::ClueCompleted {
                session_id: session_id.clone(),
            },
        );
        harness.choose(players[0], &session_id, &clue);
        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::WaitingClue);
        assert_eq!(session.answered_count, 1);
    }

    #[test]
    fn second_buzz_is_rejected_while_one_is_pending() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob", "Cy"]);
        let clue = harness.open_clue(&session_id);
        harness.choose(players[0], &session_id, &clue);

        harness.buzz(players[1], &session_id);
        harness.buzz(players[2], &session_id);
        harness.buzz(players[1], &session_id);

        let session = harness.session(&session_id);
        assert_eq!(session.buzzed_player_id, Some(players[1]));
        assert_eq!(session.attempts.len(), 1);
        assert_eq!(session.status(), SessionStatus::PlayerBuzzed);
        assert!(session.buzz_timeout.is_none());
        assert_eq!(
            harness.scheduled(SessionTimer::AnswerWindow),
            vec![Duration::from_secs(5)]
        );
    }

    #[test]
    fn wrong_answer_then_silence_costs_only_the_answerer() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let (ada, bob) = (players[0], players[1]);
        let clue = harness.open_clue(&session_id);
        let before = harness.session(&session_id).answered_count;
        harness.choose(ada, &session_id, &clue);

        harness.buzz(ada, &session_id);
        harness.answer(ada, &session_id, Some("wrong"));
        assert_eq!(
            harness.session(&session_id).status(),
            SessionStatus::WaitingBuzz
        );
        harness.fire_reopen_delay();
        assert!(harness.frames(bob).contains(&ServerMessage::BuzzWindowOpen {
            timeout_ms: 3_000
        }));
        assert!(harness.fire_buzz_window());

        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::Scoring);
        assert_eq!(session.answered_count, before + 1);
        assert_eq!(harness.player(&ada).score, -200);
        assert_eq!(harness.player(&bob).score, 0);
        assert!(harness.frames(bob).contains(&ServerMessage::AnswerRevealed {
            answer: "Mount Everest".into()
        }));
    }

    #[test]
    fn answer_timeout_reopens_then_resolves_when_everyone_tried() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let (ada, bob) = (players[0], players[1]);
        let clue = harness.open_clue(&session_id);
        harness.choose(ada, &session_id, &clue);

        harness.buzz(bob, &session_id);
        assert!(harness.fire_answer_window());
        assert!(harness.frames(ada).contains(&ServerMessage::status("Time is up for Bob!")));
        assert_eq!(
            harness.session(&session_id).attempts[&bob].outcome,
            Outcome::Timeout
        );

        harness.buzz(ada, &session_id);
        harness.answer(ada, &session_id, None);
        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::Scoring);
        assert!(session.reopen_timeout.is_none());
        assert_eq!(harness.player(&ada).score, -200);
        assert_eq!(harness.player(&bob).score, -200);
    }

    #[test]
    fn stale_buzz_window_firing_is_ignored() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let clue = harness.open_clue(&session_id);
        harness.choose(players[0], &session_id, &clue);
        let token = harness.session(&session_id).buzz_timeout.as_ref().unwrap().token();
        harness.buzz(players[1], &session_id);

        harness.fire_token(&session_id, SessionTimer::BuzzWindow, token);
        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::PlayerBuzzed);
        assert_eq!(session.buzzed_player_id, Some(players[1]));
    }

    #[test]
    fn exhausting_round_one_moves_to_round_two_once() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada", "Bob"]);
        let (ada, bob) = (players[0], players[1]);
        let round_total = harness.session(&session_id).board.round_size(Round::Round1);

        // Ada takes the first clue, nobody buzzes on the rest: Bob ends lowest.
        for index in 0..round_total {
            let clue = harness.open_clue(&session_id);
            harness.choose(ada, &session_id, &clue);
            if index == 0 {
                harness.buzz(ada, &session_id);
                harness.answer(ada, &session_id, Some("everest"));
            } else {
                harness.fire_buzz_window();
            }
            assert!(harness.session(&session_id).answered_count <= round_total);
            harness.clear_frames();
            harness.complete(ada, &session_id);
        }

        let session = harness.session(&session_id);
        assert_eq!(session.round, Round::Round2);
        assert_eq!(session.answered_count, 0);
        assert_eq!(session.turn_player_id, bob);
        assert!(session.pending_turn_player_id.is_none());
        assert!(harness.frames(bob).contains(&ServerMessage::TurnAssigned));
        let frames = harness.frames(ada);
        assert!(frames.contains(&ServerMessage::status(
            "Welcome to Round 2, points are doubled. Bob now has Control of the Board!"
        )));
        let round_two_boards = frames
            .iter()
            .filter(|frame| {
                matches!(
                    frame,
                    ServerMessage::BoardCreated {
                        round: Round::Round2,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(round_two_boards, 1);

        let clue = harness.open_clue(&session_id);
        harness.choose(bob, &session_id, &clue);
        let session = harness.session(&session_id);
        let face_value = session.board.clue(&clue).unwrap().value as i32;
        assert_eq!(session.current_clue_value, Some(face_value * 2));
    }

    #[test]
    fn exhausting_round_two_finishes_the_game() {
        let mut harness = Harness::new();
        let (session_id, players) = harness.started_game(&["Ada"]);
        let ada = players[0];

        for _ in 0..2 {
            let total = harness.session(&session_id).board.round_size(harness.session(&session_id).round);
            for _ in 0..total {
                let clue = harness.open_clue(&session_id);
                harness.choose(ada, &session_id, &clue);
                harness.fire_buzz_window();
                harness.complete(ada, &session_id);
            }
        }

        let session = harness.session(&session_id);
        assert_eq!(session.status(), SessionStatus::Finished);
        assert!(harness.frames(ada).iter().any(|frame| matches!(frame, ServerMessage::GameOver { players } if players.len() == 1)));
        assert!(session.board.final_clue_id().is_some());
    }
}
