use std::time::Duration;

use crate::{
    config::AppConfig,
    dao::corpus::ClueCorpus,
    dto::ws::{ScoreboardEntry, ServerMessage},
    state::{
        PlayerId,
        registry::Players,
        session::Session,
        timeout::{SessionTimer, TimerScheduler, TimerTarget},
    },
};

/// Delivery of outbound frames to individual players.
pub trait Outbox: Send + Sync {
    /// Queue `message` for `player_id`. Unknown or closed connections are skipped.
    fn send(&self, player_id: &PlayerId, message: &ServerMessage);
}

/// Collaborators borrowed by every handler while one command is processed.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    /// Runtime configuration.
    pub config: &'a AppConfig,
    /// Clue corpus used to assemble boards.
    pub corpus: &'a ClueCorpus,
    /// Outbound delivery.
    pub outbox: &'a dyn Outbox,
    /// Timeout source.
    pub scheduler: &'a dyn TimerScheduler,
}

impl Ctx<'_> {
    /// Targeted frame.
    pub fn send(&self, player_id: &PlayerId, message: ServerMessage) {
        self.outbox.send(player_id, &message);
    }

    /// Frame for every member of `session`.
    pub fn broadcast(&self, session: &Session, message: ServerMessage) {
        for member in &session.members {
            self.outbox.send(member, &message);
        }
    }

    /// Frame for every member of `session` except `skipped`.
    pub fn broadcast_except(&self, session: &Session, skipped: &PlayerId, message: ServerMessage) {
        for member in session.members.iter().filter(|member| *member != skipped) {
            self.outbox.send(member, &message);
        }
    }

    /// Status line for every member of `session`.
    pub fn status(&self, session: &Session, text: impl Into<String>) {
        self.broadcast(session, ServerMessage::status(text));
    }

    /// Full scoreboard for every member of `session`.
    pub fn broadcast_scoreboard(&self, session: &Session, players: &Players, reset: bool) {
        self.broadcast(
            session,
            ServerMessage::ScoreboardUpdate {
                players: scoreboard(session, players),
                reset,
            },
        );
    }

    /// Start `timer` on `session`, replacing any previous one.
    pub fn arm(&self, session: &mut Session, timer: SessionTimer, delay: Duration) {
        let timeout = self.scheduler.schedule(
            TimerTarget::Session {
                session_id: session.id.clone(),
                timer,
            },
            delay,
        );
        session.arm(timer, timeout);
    }
}

/// Scores of every member, in join order.
pub fn scoreboard(session: &Session, players: &Players) -> Vec<ScoreboardEntry> {
    session
        .members
        .iter()
        .filter_map(|id| players.get(id))
        .map(|player| ScoreboardEntry {
            id: player.id,
            name: player.display_name().to_string(),
            score: player.score,
        })
        .collect()
}

/// Lobby roster in join order, the owner suffixed with ` (Owner)`.
pub fn lobby_names(session: &Session, players: &Players) -> Vec<String> {
    session
        .members
        .iter()
        .filter_map(|id| players.get(id))
        .map(|player| {
            if player.id == session.owner_id {
                format!("{} (Owner)", player.display_name())
            } else {
                player.display_name().to_string()
            }
        })
        .collect()
}
