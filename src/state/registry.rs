//! Owned containers for every live session and player.

use std::collections::HashMap;

use rand::Rng;
use tracing::info;

use crate::{
    error::Rejection,
    state::{
        PlayerId,
        session::{Player, Session},
        session_id::SessionId,
    },
};

/// Players known to the engine, keyed by id.
#[derive(Debug, Default)]
pub struct Players(HashMap<PlayerId, Player>);

impl Players {
    /// Look up a player.
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.0.get(id)
    }

    /// Look up a player for mutation.
    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.0.get_mut(id)
    }

    /// Look up a player, failing with [`Rejection::UnknownPlayer`].
    pub fn require_mut(&mut self, id: &PlayerId) -> Result<&mut Player, Rejection> {
        self.0.get_mut(id).ok_or(Rejection::UnknownPlayer(*id))
    }

    /// Register a player, replacing any record with the same id.
    pub fn insert(&mut self, player: Player) {
        self.0.insert(player.id, player);
    }

    /// Forget a player.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        self.0.remove(id)
    }

    /// Whether a player with this id is registered.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.0.contains_key(id)
    }

    /// Display name of a player, empty if unknown.
    pub fn name(&self, id: &PlayerId) -> String {
        self.0
            .get(id)
            .map(|player| player.display_name().to_string())
            .unwrap_or_default()
    }

    /// Score of a player, zero if unknown.
    pub fn score(&self, id: &PlayerId) -> i32 {
        self.0.get(id).map_or(0, |player| player.score)
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no player is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Session and player registry owned by the engine.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    players: Players,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session owned by `owner` under a fresh id.
    pub fn create_session<R: Rng + ?Sized>(&mut self, owner: PlayerId, rng: &mut R) -> SessionId {
        let id = SessionId::generate(rng, |candidate| self.sessions.contains_key(candidate));
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), owner));
        info!(session_id = %id, owner = %owner, "session created");
        id
    }

    /// Look up a session.
    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Destroy a session, cancelling any timeout still bound to it.
    pub fn remove_session(&mut self, id: &SessionId) -> Option<Session> {
        let mut session = self.sessions.remove(id)?;
        session.cancel_timeouts();
        info!(session_id = %id, "session destroyed");
        Some(session)
    }

    /// Borrow a session together with the player table.
    pub fn session_with_players(&mut self, id: &SessionId) -> Option<(&mut Session, &mut Players)> {
        let session = self.sessions.get_mut(id)?;
        Some((session, &mut self.players))
    }

    /// Borrow a session `actor` belongs to, together with the player table.
    pub fn member_session(
        &mut self,
        actor: &PlayerId,
        id: &SessionId,
    ) -> Result<(&mut Session, &mut Players), Rejection> {
        let (session, players) = self
            .session_with_players(id)
            .ok_or_else(|| Rejection::UnknownSession(id.clone()))?;
        if !session.is_member(actor) {
            return Err(Rejection::NotAMember(id.clone()));
        }
        Ok((session, players))
    }

    /// Player table.
    pub fn players(&self) -> &Players {
        &self.players
    }

    /// Player table, for mutation.
    pub fn players_mut(&mut self) -> &mut Players {
        &mut self.players
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
