//! Membership of sessions: connection lifecycle, create/join/leave, owner
//! succession and the disconnect grace period.

use tracing::{debug, info};

use crate::{
    dto::{validation::validate_display_name, ws::ServerMessage},
    error::{LobbyError, Rejection},
    services::{
        context::{Ctx, lobby_names},
        gameplay, scoring,
    },
    state::{
        PlayerId,
        registry::{Players, Registry},
        session::{Player, Session},
        session_id::SessionId,
        state_machine::SessionStatus,
        timeout::{SessionTimer, TimerTarget, TimerToken},
    },
};

/// A socket identified itself. Reusing a known id cancels its pending removal.
pub fn connect(ctx: &Ctx<'_>, registry: &mut Registry, player_id: PlayerId) {
    match registry.players_mut().get_mut(&player_id) {
        Some(player) => {
            player.disconnected = false;
            if let Some(grace) = player.grace_timeout.take() {
                grace.cancel();
            }
            info!(player_id = %player_id, "player reconnected");
        }
        None => {
            registry.players_mut().insert(Player::new(player_id));
            info!(player_id = %player_id, "player connected");
        }
    }
    ctx.send(&player_id, ServerMessage::Connected { player_id });
}

/// A socket closed. The player is kept for the grace period.
pub fn disconnect(ctx: &Ctx<'_>, registry: &mut Registry, player_id: PlayerId) {
    let Some(player) = registry.players_mut().get_mut(&player_id) else {
        return;
    };
    player.disconnected = true;
    let grace = ctx.scheduler.schedule(
        TimerTarget::DisconnectGrace { player_id },
        ctx.config.timings.disconnect_grace,
    );
    if let Some(previous) = player.grace_timeout.replace(grace) {
        previous.cancel();
    }
    info!(player_id = %player_id, "player disconnected, grace period started");
}

/// The grace period of a disconnected player elapsed.
pub fn grace_expired(
    ctx: &Ctx<'_>,
    registry: &mut Registry,
    player_id: PlayerId,
    token: TimerToken,
) {
    let Some(player) = registry.players_mut().get_mut(&player_id) else {
        return;
    };
    let current = player.grace_timeout.as_ref().map(|grace| grace.token());
    if !player.disconnected || current != Some(token) {
        debug!(player_id = %player_id, token, "stale grace period ignored");
        return;
    }
    player.grace_timeout = None;

    if let Some(session_id) = player.session_id.clone()
        && let Err(rejection) = remove_member(ctx, registry, &session_id, player_id)
    {
        debug!(player_id = %player_id, error = %rejection, "cleanup after grace period failed");
    }
    registry.players_mut().remove(&player_id);
    info!(player_id = %player_id, "player removed after grace period");
}

fn check_name(ctx: &Ctx<'_>, display_name: &str) -> Result<(), LobbyError> {
    validate_display_name(display_name, ctx.config.max_name_length).map_err(|err| {
        LobbyError::InvalidName {
            code: err.code.to_string(),
            message: err
                .message
                .map(|message| message.to_string())
                .unwrap_or_else(|| err.code.to_string()),
        }
    })
}

/// Open a new session owned by `actor`.
pub fn create_session(
    ctx: &Ctx<'_>,
    registry: &mut Registry,
    actor: PlayerId,
    display_name: &str,
) -> Result<(), LobbyError> {
    check_name(ctx, display_name)?;
    if !registry.players().contains(&actor) {
        return Ok(());
    }
    leave_current(ctx, registry, actor);

    let session_id = registry.create_session(actor, &mut rand::rng());
    if let Some(player) = registry.players_mut().get_mut(&actor) {
        player.name = Some(display_name.to_string());
        player.is_owner = true;
        player.session_id = Some(session_id.clone());
        player.score = 0;
    }
    ctx.send(&actor, ServerMessage::SessionCreated { session_id });
    Ok(())
}

/// Add `actor` to an existing session.
pub fn join_session(
    ctx: &Ctx<'_>,
    registry: &mut Registry,
    actor: PlayerId,
    display_name: &str,
    session_id: &SessionId,
) -> Result<(), LobbyError> {
    check_name(ctx, display_name)?;
    let session = registry
        .session(session_id)
        .ok_or(LobbyError::UnknownSession)?;
    if session.status() == SessionStatus::Finished {
        return Err(LobbyError::SessionFinished);
    }
    if session.is_member(&actor) {
        return Err(LobbyError::AlreadyJoined);
    }
    let players = registry.players();
    let taken = session
        .members
        .iter()
        .filter_map(|member| players.get(member))
        .any(|member| member.name.as_deref() == Some(display_name));
    if taken {
        return Err(LobbyError::DuplicateName);
    }
    let player_names = lobby_names(session, players);

    leave_current(ctx, registry, actor);
    let Some((session, players)) = registry.session_with_players(session_id) else {
        return Err(LobbyError::UnknownSession);
    };
    let Some(player) = players.get_mut(&actor) else {
        return Ok(());
    };
    player.name = Some(display_name.to_string());
    player.is_owner = false;
    player.session_id = Some(session_id.clone());
    player.score = 0;
    session.members.insert(actor);
    info!(session_id = %session_id, player_id = %actor, "player joined");

    ctx.broadcast_except(
        session,
        &actor,
        ServerMessage::LobbyUpdate {
            names: vec![display_name.to_string()],
            reset: false,
        },
    );
    ctx.send(
        &actor,
        ServerMessage::SessionJoined {
            session_id: session_id.clone(),
            error: None,
            player_names,
        },
    );
    if session.status() != SessionStatus::Lobby {
        ctx.broadcast_scoreboard(session, players, true);
    }
    Ok(())
}

/// `actor` leaves `session_id` on purpose.
pub fn leave_session(
    ctx: &Ctx<'_>,
    registry: &mut Registry,
    actor: PlayerId,
    session_id: &SessionId,
) -> Result<(), Rejection> {
    registry.member_session(&actor, session_id)?;
    remove_member(ctx, registry, session_id, actor)
}

fn leave_current(ctx: &Ctx<'_>, registry: &mut Registry, actor: PlayerId) {
    let Some(current) = registry
        .players()
        .get(&actor)
        .and_then(|player| player.session_id.clone())
    else {
        return;
    };
    if let Err(rejection) = remove_member(ctx, registry, &current, actor) {
        debug!(player_id = %actor, error = %rejection, "leaving previous session failed");
    }
}

/// Drop `player_id` from `session_id`, destroying the session once empty.
fn remove_member(
    ctx: &Ctx<'_>,
    registry: &mut Registry,
    session_id: &SessionId,
    player_id: PlayerId,
) -> Result<(), Rejection> {
    if let Some(player) = registry.players_mut().get_mut(&player_id) {
        player.session_id = None;
        player.is_owner = false;
    }
    let Some((session, players)) = registry.session_with_players(session_id) else {
        return Ok(());
    };
    session.members.shift_remove(&player_id);
    session.attempts.shift_remove(&player_id);
    info!(session_id = %session_id, player_id = %player_id, "player left session");
    if session.members.is_empty() {
        registry.remove_session(session_id);
        return Ok(());
    }

    let owner_left = session.owner_id == player_id;
    if owner_left {
        transfer_ownership(ctx, session, players);
    }

    if session.buzzed_player_id == Some(player_id)
        && let Some(fired) = session
            .answer_timeout
            .as_ref()
            .and_then(|timeout| timeout.force_fire())
    {
        gameplay::on_timer(ctx, session, players, SessionTimer::AnswerWindow, fired.token)?;
    } else if owner_left && session.status() == SessionStatus::Scoring {
        scoring::prompt_owner(ctx, session);
    }

    match session.status() {
        SessionStatus::Lobby => {
            session.turn_player_id = session.owner_id;
            ctx.broadcast(
                session,
                ServerMessage::LobbyUpdate {
                    names: lobby_names(session, players),
                    reset: true,
                },
            );
        }
        SessionStatus::Finished => {}
        status => {
            ctx.broadcast_scoreboard(session, players, true);
            if status == SessionStatus::WaitingClue && session.turn_player_id == player_id {
                hand_control_to_first_member(ctx, session, players);
            }
        }
    }
    Ok(())
}

fn transfer_ownership(ctx: &Ctx<'_>, session: &mut Session, players: &mut Players) {
    let Some(heir) = session.members.first().copied() else {
        return;
    };
    session.owner_id = heir;
    if let Some(player) = players.get_mut(&heir) {
        player.is_owner = true;
    }
    info!(session_id = %session.id, player_id = %heir, "ownership transferred");
    ctx.send(&heir, ServerMessage::OwnershipGranted);
}

fn hand_control_to_first_member(ctx: &Ctx<'_>, session: &mut Session, players: &Players) {
    let Some(first) = session.members.first().copied() else {
        return;
    };
    session.turn_player_id = first;
    ctx.send(&first, ServerMessage::TurnAssigned);
    ctx.status(
        session,
        format!("{} now has Control of the Board!", players.name(&first)),
    );
}
