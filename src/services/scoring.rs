//! Answer grading, automatic tally and the owner's override cycle.

use tracing::{debug, info};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    dto::ws::ServerMessage,
    error::Rejection,
    services::context::Ctx,
    state::{
        PlayerId,
        registry::Players,
        session::{Outcome, ScoreState, Session},
        state_machine::SessionEvent,
    },
};

/// Reduce an answer to the characters that matter for grading.
///
/// Lower-cases, strips diacritics, drops the leading-phrase fillers
/// (`what is`, `who is`) and the articles `the` and `a`, then removes
/// whitespace and punctuation.
pub fn normalize_answer(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    let mut normalized = String::with_capacity(folded.len());
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        if matches!(word, "what" | "who") && words.get(index + 1) == Some(&"is") {
            index += 2;
            continue;
        }
        if !matches!(word, "the" | "a") {
            normalized.push_str(word);
        }
        index += 1;
    }
    normalized
}

/// Whether `submission` is accepted for `answer`.
///
/// The normalized submission must be non-empty and contained in the
/// normalized answer.
pub fn is_correct(submission: &str, answer: &str) -> bool {
    let submission = normalize_answer(submission);
    !submission.is_empty() && normalize_answer(answer).contains(&submission)
}

/// Settle the active clue: tally every attempt and hand over to the owner.
pub fn resolve_clue(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
) -> Result<(), Rejection> {
    session.machine.ensure(SessionEvent::Resolve)?;
    session.cancel_timeouts();
    session.buzzed_player_id = None;

    let value = session.current_clue_value.unwrap_or_default();
    for (player_id, attempt) in session.attempts.iter_mut() {
        let Some(player) = players.get_mut(player_id) else {
            continue;
        };
        let state = if attempt.outcome == Outcome::Correct {
            player.score = player.score.saturating_add(value);
            ScoreState::Positive
        } else {
            player.score = player.score.saturating_sub(value);
            ScoreState::Negative
        };
        attempt.score_state = Some(state);
        attempt.score = player.score;
    }
    session.machine.apply(SessionEvent::Resolve)?;
    info!(
        session_id = %session.id,
        clue_id = ?session.current_clue_id,
        attempts = session.attempts.len(),
        "clue resolved"
    );

    ctx.broadcast_scoreboard(session, players, false);
    ctx.broadcast(
        session,
        ServerMessage::ScoringResult {
            players: session.attempts.clone(),
        },
    );

    let owner_id = session.owner_id;
    ctx.broadcast_except(
        session,
        &owner_id,
        ServerMessage::status(format!("{}Waiting for game owner", confirmation_prefix(session))),
    );
    prompt_owner(ctx, session);
    Ok(())
}

fn confirmation_prefix(session: &Session) -> &'static str {
    if session.attempts.is_empty() {
        ""
    } else {
        "Confirming Player Scores: "
    }
}

/// Ask the current owner to close the scored clue.
pub fn prompt_owner(ctx: &Ctx<'_>, session: &Session) {
    ctx.send(
        &session.owner_id,
        ServerMessage::status(format!("{}Press Continue", confirmation_prefix(session))),
    );
}

/// Cycle `target`'s verdict on the active clue.
///
/// `negative → positive → neutral → negative`, adjusting the score so that
/// each state reflects `-V`, `+V` and `0` respectively. Marking a player
/// negative lines them up to take control at the next board emission.
pub fn override_score(
    ctx: &Ctx<'_>,
    session: &mut Session,
    players: &mut Players,
    actor: PlayerId,
    target: PlayerId,
) -> Result<(), Rejection> {
    if session.owner_id != actor {
        return Err(Rejection::NotOwner);
    }
    session.machine.ensure(SessionEvent::OverrideScore)?;
    let current = session
        .attempts
        .get(&target)
        .and_then(|attempt| attempt.score_state)
        .ok_or(Rejection::UnknownAttempt(target))?;
    let player = players.require_mut(&target)?;

    let value = session.current_clue_value.unwrap_or_default();
    let next = match current {
        ScoreState::Negative => {
            // Undo the loss, then award the gain.
            player.score = player.score.saturating_add(value).saturating_add(value);
            if session.pending_turn_player_id == Some(target) {
                session.pending_turn_player_id = None;
            }
            ScoreState::Positive
        }
        ScoreState::Positive => {
            player.score = player.score.saturating_sub(value);
            if session.pending_turn_player_id == Some(target) {
                session.pending_turn_player_id = None;
            }
            ScoreState::Neutral
        }
        ScoreState::Neutral => {
            player.score = player.score.saturating_sub(value);
            if session.turn_player_id != target {
                session.pending_turn_player_id = Some(target);
            }
            ScoreState::Negative
        }
    };
    let score = player.score;

    if let Some(attempt) = session.attempts.get_mut(&target) {
        attempt.score_state = Some(next);
        attempt.score = score;
    }
    session.machine.apply(SessionEvent::OverrideScore)?;
    debug!(
        session_id = %session.id,
        player_id = %target,
        from = ?current,
        to = ?next,
        score,
        "score overridden"
    );

    ctx.broadcast(
        session,
        ServerMessage::ScoreCorrection {
            player_id: target,
            score_state: next,
            score,
        },
    );
    Ok(())
}
