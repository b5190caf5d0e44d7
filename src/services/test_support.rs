//! In-process drivers shared by the engine tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::corpus::{ClueCorpus, CorpusClue},
    dto::ws::{ClientMessage, ServerMessage},
    services::{
        context::Outbox,
        engine::{Command, Engine},
    },
    state::{
        PlayerId,
        session::{Player, Session},
        session_id::SessionId,
        timeout::{SessionTimer, TimerFired, TimerTarget, TimerToken, manual::ManualScheduler},
    },
};

/// Corpus with `categories` categories of two 200/400 buckets each. Every
/// clue answers "Mount Everest".
pub fn test_corpus(categories: usize) -> ClueCorpus {
    corpus_with_values(categories, &[200, 400])
}

/// Like [`test_corpus`] with one bucket per entry of `values`.
pub fn corpus_with_values(categories: usize, values: &[u32]) -> ClueCorpus {
    let mut map = IndexMap::new();
    for index in 0..categories {
        let name = format!("CATEGORY {index}");
        let mut buckets = BTreeMap::new();
        for &value in values {
            let clues = (0..2)
                .map(|variant| CorpusClue {
                    id: format!("c{index}-{value}-{variant}"),
                    category: name.clone(),
                    question: format!("{name} for {value}"),
                    answer: "Mount Everest".into(),
                    value: Some(value),
                })
                .collect();
            buckets.insert(value, clues);
        }
        map.insert(name, buckets);
    }
    let finals = vec![CorpusClue {
        id: "final-1".into(),
        category: "LANDMARKS".into(),
        question: "Highest peak on Earth".into(),
        answer: "Mount Everest".into(),
        value: None,
    }];
    ClueCorpus::new(map, finals)
}

/// Outbox keeping every frame for later inspection.
#[derive(Default)]
pub struct RecordingOutbox {
    frames: Mutex<Vec<(PlayerId, ServerMessage)>>,
}

impl RecordingOutbox {
    pub fn frames_for(&self, player_id: PlayerId) -> Vec<ServerMessage> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| *recipient == player_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

impl Outbox for RecordingOutbox {
    fn send(&self, player_id: &PlayerId, message: &ServerMessage) {
        self.frames
            .lock()
            .unwrap()
            .push((*player_id, message.clone()));
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        categories_per_round: 2,
        ..AppConfig::default()
    }
}

/// Synchronous engine with a recording outbox and hand-fired timeouts.
pub struct Harness {
    pub engine: Engine,
    pub outbox: Arc<RecordingOutbox>,
    pub scheduler: Arc<ManualScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_corpus(test_corpus(5))
    }

    pub fn with_corpus(corpus: ClueCorpus) -> Self {
        let outbox = Arc::new(RecordingOutbox::default());
        let scheduler = Arc::new(ManualScheduler::default());
        let engine = Engine::new(
            Arc::new(test_config()),
            Arc::new(corpus),
            outbox.clone(),
            scheduler.clone(),
        );
        Self {
            engine,
            outbox,
            scheduler,
        }
    }

    pub fn connect(&mut self) -> PlayerId {
        let player_id = Uuid::new_v4();
        self.reconnect(player_id);
        player_id
    }

    pub fn reconnect(&mut self, player_id: PlayerId) {
        self.engine.handle(Command::Connected { player_id });
    }

    pub fn disconnect(&mut self, player_id: PlayerId) {
        self.engine.handle(Command::Disconnected { player_id });
    }

    pub fn act(&mut self, player_id: PlayerId, message: ClientMessage) {
        self.engine.handle(Command::Action { player_id, message });
    }

    /// Id of the last session announced to `player_id`.
    pub fn created_session(&self, player_id: PlayerId) -> SessionId {
        self.frames(player_id)
            .into_iter()
            .rev()
            .find_map(|frame| match frame {
                ServerMessage::SessionCreated { session_id } => Some(session_id),
                _ => None,
            })
            .expect("no session created")
    }

    /// Lobby with one connected member per name; the first one owns it.
    pub fn lobby(&mut self, names: &[&str]) -> (SessionId, Vec<PlayerId>) {
        let players: Vec<_> = names.iter().map(|_| self.connect()).collect();
        self.act(
            players[0],
            ClientMessage::CreateSession {
                display_name: names[0].into(),
            },
        );
        let session_id = self.created_session(players[0]);
        for (player_id, name) in players.iter().zip(names).skip(1) {
            self.act(
                *player_id,
                ClientMessage::JoinSession {
                    display_name: (*name).into(),
                    session_id: session_id.clone(),
                },
            );
        }
        (session_id, players)
    }

    pub fn started_game(&mut self, names: &[&str]) -> (SessionId, Vec<PlayerId>) {
        let (session_id, players) = self.lobby(names);
        self.act(
            players[0],
            ClientMessage::StartSession {
                session_id: session_id.clone(),
            },
        );
        (session_id, players)
    }

    pub fn session(&self, session_id: &SessionId) -> &Session {
        self.engine
            .registry()
            .session(session_id)
            .expect("session exists")
    }

    pub fn player(&self, player_id: &PlayerId) -> &Player {
        self.engine
            .registry()
            .players()
            .get(player_id)
            .expect("player exists")
    }

    pub fn frames(&self, player_id: PlayerId) -> Vec<ServerMessage> {
        self.outbox.frames_for(player_id)
    }

    pub fn clear_frames(&self) {
        self.outbox.clear();
    }

    /// First unanswered clue of the active round.
    pub fn open_clue(&self, session_id: &SessionId) -> String {
        let session = self.session(session_id);
        session
            .board
            .open_clues(session.round)
            .into_iter()
            .next()
            .expect("an open clue")
    }

    pub fn choose(&mut self, player_id: PlayerId, session_id: &SessionId, clue_id: &str) {
        self.act(
            player_id,
            ClientMessage::ClueChosen {
                session_id: session_id.clone(),
                clue_id: clue_id.into(),
            },
        );
    }

    pub fn buzz(&mut self, player_id: PlayerId, session_id: &SessionId) {
        self.act(
            player_id,
            ClientMessage::BuzzIn {
                session_id: session_id.clone(),
            },
        );
    }

    pub fn answer(&mut self, player_id: PlayerId, session_id: &SessionId, text: Option<&str>) {
        self.act(
            player_id,
            ClientMessage::SubmitAnswer {
                session_id: session_id.clone(),
                answer_text: text.map(str::to_string),
            },
        );
    }

    pub fn complete(&mut self, player_id: PlayerId, session_id: &SessionId) {
        self.act(
            player_id,
            ClientMessage::ClueCompleted {
                session_id: session_id.clone(),
            },
        );
    }

    fn fire(&mut self, matches: impl Fn(&TimerTarget) -> bool) -> bool {
        match self.scheduler.fire(matches) {
            Some(fired) => {
                self.engine.handle(Command::Timer(fired));
                true
            }
            None => false,
        }
    }

    fn fire_session(&mut self, timer: SessionTimer) -> bool {
        self.fire(|target| {
            matches!(target, TimerTarget::Session { timer: armed, .. } if *armed == timer)
        })
    }

    pub fn fire_buzz_window(&mut self) -> bool {
        self.fire_session(SessionTimer::BuzzWindow)
    }

    pub fn fire_answer_window(&mut self) -> bool {
        self.fire_session(SessionTimer::AnswerWindow)
    }

    pub fn fire_reopen_delay(&mut self) -> bool {
        self.fire_session(SessionTimer::ReopenDelay)
    }

    pub fn fire_grace(&mut self, player_id: PlayerId) -> bool {
        self.fire(|target| {
            matches!(target, TimerTarget::DisconnectGrace { player_id: pending } if *pending == player_id)
        })
    }

    /// Deliver a firing with an explicit token, stale or not.
    pub fn fire_token(&mut self, session_id: &SessionId, timer: SessionTimer, token: TimerToken) {
        self.engine.handle(Command::Timer(TimerFired {
            target: TimerTarget::Session {
                session_id: session_id.clone(),
                timer,
            },
            token,
        }));
    }

    /// Delays of every still pending `timer`.
    pub fn scheduled(&self, timer: SessionTimer) -> Vec<Duration> {
        self.scheduler.pending(|target| {
            matches!(target, TimerTarget::Session { timer: armed, .. } if *armed == timer)
        })
    }
}
