//! Single-writer session engine.
//!
//! Every mutation of sessions and players goes through [`Engine::handle`],
//! which is driven by exactly one dispatcher task. Socket handlers and timeout
//! tasks only post [`Command`]s onto the engine channel, so handlers never
//! interleave and need no locks.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    dao::corpus::ClueCorpus,
    dto::{
        session::SessionSummary,
        ws::{ClientMessage, ServerMessage},
    },
    error::{LobbyError, Rejection},
    services::{
        context::{Ctx, Outbox},
        gameplay, lobby, scoring,
    },
    state::{
        AppState, PlayerId, SharedState,
        connections::ConnectionHub,
        registry::Registry,
        session_id::SessionId,
        timeout::{TimerFired, TimerScheduler, TimerTarget, TokioScheduler},
    },
};

/// Counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Live sessions.
    pub sessions: usize,
    /// Known players, connected or within their grace period.
    pub players: usize,
}

/// Inputs processed by the engine, in arrival order.
#[derive(Debug)]
pub enum Command {
    /// A socket identified itself as `player_id`.
    Connected {
        /// Identified player.
        player_id: PlayerId,
    },
    /// The socket of `player_id` closed.
    Disconnected {
        /// Player whose socket closed.
        player_id: PlayerId,
    },
    /// A client frame sent by `player_id`.
    Action {
        /// Sender.
        player_id: PlayerId,
        /// Parsed frame.
        message: ClientMessage,
    },
    /// A timeout elapsed.
    Timer(TimerFired),
    /// Read-only projection of one session.
    Inspect {
        /// Session to project.
        session_id: SessionId,
        /// Reply channel.
        reply: oneshot::Sender<Option<SessionSummary>>,
    },
    /// Registry counters.
    Stats {
        /// Reply channel.
        reply: oneshot::Sender<EngineStats>,
    },
}

/// Owner of every session and player record.
pub struct Engine {
    config: Arc<AppConfig>,
    corpus: Arc<ClueCorpus>,
    registry: Registry,
    outbox: Arc<dyn Outbox>,
    scheduler: Arc<dyn TimerScheduler>,
}

impl Engine {
    /// Build an engine with an empty registry.
    pub fn new(
        config: Arc<AppConfig>,
        corpus: Arc<ClueCorpus>,
        outbox: Arc<dyn Outbox>,
        scheduler: Arc<dyn TimerScheduler>,
    ) -> Self {
        Self {
            config,
            corpus,
            registry: Registry::new(),
            outbox,
            scheduler,
        }
    }

    /// Read access to sessions and players.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Process one command to completion.
    pub fn handle(&mut self, command: Command) {
        let ctx = Ctx {
            config: &self.config,
            corpus: &self.corpus,
            outbox: self.outbox.as_ref(),
            scheduler: self.scheduler.as_ref(),
        };
        let registry = &mut self.registry;

        match command {
            Command::Connected { player_id } => lobby::connect(&ctx, registry, player_id),
            Command::Disconnected { player_id } => lobby::disconnect(&ctx, registry, player_id),
            Command::Action { player_id, message } => {
                handle_action(&ctx, registry, player_id, message)
            }
            Command::Timer(fired) => handle_timer(&ctx, registry, fired),
            Command::Inspect { session_id, reply } => {
                let summary = registry
                    .session(&session_id)
                    .map(|session| SessionSummary::from_session(session, registry.players()));
                let _ = reply.send(summary);
            }
            Command::Stats { reply } => {
                let _ = reply.send(EngineStats {
                    sessions: registry.session_count(),
                    players: registry.players().len(),
                });
            }
        }
    }
}

fn handle_action(ctx: &Ctx<'_>, registry: &mut Registry, actor: PlayerId, message: ClientMessage) {
    if !registry.players().contains(&actor) {
        debug!(player_id = %actor, "action from unidentified player dropped");
        return;
    }

    let result = match message {
        ClientMessage::CreateSession { display_name } => {
            if let Err(err) = lobby::create_session(ctx, registry, actor, &display_name) {
                report_lobby_error(ctx, actor, None, err);
            }
            Ok(())
        }
        ClientMessage::JoinSession {
            display_name,
            session_id,
        } => {
            if let Err(err) = lobby::join_session(ctx, registry, actor, &display_name, &session_id)
            {
                report_lobby_error(ctx, actor, Some(session_id), err);
            }
            Ok(())
        }
        ClientMessage::LeaveSession { session_id } => {
            lobby::leave_session(ctx, registry, actor, &session_id)
        }
        ClientMessage::StartSession { session_id } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, players)| gameplay::start_session(ctx, session, players, actor)),
        ClientMessage::ClueChosen {
            session_id,
            clue_id,
        } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, _)| gameplay::choose_clue(ctx, session, actor, &clue_id)),
        ClientMessage::BuzzIn { session_id } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, players)| gameplay::buzz_in(ctx, session, players, actor)),
        ClientMessage::SubmitAnswer {
            session_id,
            answer_text,
        } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, players)| {
                gameplay::submit_answer(ctx, session, players, actor, answer_text.as_deref())
            }),
        ClientMessage::OverrideScore {
            session_id,
            player_id,
        } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, players)| {
                scoring::override_score(ctx, session, players, actor, player_id)
            }),
        ClientMessage::ClueCompleted { session_id } => registry
            .member_session(&actor, &session_id)
            .and_then(|(session, players)| gameplay::clue_completed(ctx, session, players, actor)),
        ClientMessage::Identification { .. } => {
            debug!(player_id = %actor, "repeated identification ignored");
            Ok(())
        }
        ClientMessage::Unknown => {
            debug!(player_id = %actor, "unknown message type ignored");
            Ok(())
        }
    };

    if let Err(rejection) = result {
        report_rejection(actor, &rejection);
    }
}

fn report_rejection(actor: PlayerId, rejection: &Rejection) {
    debug!(player_id = %actor, error = %rejection, "action rejected");
}

fn report_lobby_error(
    ctx: &Ctx<'_>,
    actor: PlayerId,
    session_id: Option<SessionId>,
    err: LobbyError,
) {
    debug!(player_id = %actor, error = %err, "lobby request refused");
    let message = match (session_id, &err) {
        (Some(session_id), LobbyError::UnknownSession)
        | (Some(session_id), LobbyError::DuplicateName)
        | (Some(session_id), LobbyError::AlreadyJoined)
        | (Some(session_id), LobbyError::SessionFinished) => ServerMessage::SessionJoined {
            session_id,
            error: Some(err.to_string()),
            player_names: Vec::new(),
        },
        _ => ServerMessage::ActionError {
            message: err.to_string(),
        },
    };
    ctx.send(&actor, message);
}

fn handle_timer(ctx: &Ctx<'_>, registry: &mut Registry, fired: TimerFired) {
    match fired.target {
        TimerTarget::Session { session_id, timer } => {
            let Some((session, players)) = registry.session_with_players(&session_id) else {
                debug!(session_id = %session_id, ?timer, "timeout for a removed session ignored");
                return;
            };
            if let Err(rejection) = gameplay::on_timer(ctx, session, players, timer, fired.token) {
                debug!(session_id = %session_id, ?timer, error = %rejection, "timeout handling failed");
            }
        }
        TimerTarget::DisconnectGrace { player_id } => {
            lobby::grace_expired(ctx, registry, player_id, fired.token)
        }
    }
}

/// Drive `engine` from `commands` until every sender is gone.
pub fn spawn_dispatcher(
    mut engine: Engine,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            engine.handle(command);
        }
        info!("engine dispatcher stopped");
    })
}

/// Wire the engine, its timeout source and the connection hub together.
pub fn start(config: Arc<AppConfig>, corpus: Arc<ClueCorpus>) -> SharedState {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let connections = Arc::new(ConnectionHub::default());
    let scheduler = Arc::new(TokioScheduler::new(commands_tx.clone()));
    info!(
        categories = corpus.categories().len(),
        finals = corpus.finals().len(),
        "starting session engine"
    );
    let engine = Engine::new(config, corpus, connections.clone(), scheduler);
    spawn_dispatcher(engine, commands_rx);
    AppState::new(connections, commands_tx)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::services::test_support::{RecordingOutbox, test_config, test_corpus};
    use crate::state::timeout::manual::ManualScheduler;

    async fn round_trip(commands: &mpsc::UnboundedSender<Command>) -> EngineStats {
        let (reply, rx) = oneshot::channel();
        commands.send(Command::Stats { reply }).unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn concurrent_buzzes_accept_exactly_one() {
        let outbox = Arc::new(RecordingOutbox::default());
        let engine = Engine::new(
            Arc::new(test_config()),
            Arc::new(test_corpus(5)),
            outbox.clone(),
            Arc::new(ManualScheduler::default()),
        );
        let (commands, rx) = mpsc::unbounded_channel();
        let dispatcher = spawn_dispatcher(engine, rx);

        let players: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        for player_id in &players {
            commands
                .send(Command::Connected {
                    player_id: *player_id,
                })
                .unwrap();
        }
        commands
            .send(Command::Action {
                player_id: players[0],
                message: ClientMessage::CreateSession {
                    display_name: "Host".into(),
                },
            })
            .unwrap();
        round_trip(&commands).await;
        let session_id = outbox
            .frames_for(players[0])
            .into_iter()
            .find_map(|frame| match frame {
                ServerMessage::SessionCreated { session_id } => Some(session_id),
                _ => None,
            })
            .unwrap();

        for (index, player_id) in players.iter().enumerate().skip(1) {
            commands
                .send(Command::Action {
                    player_id: *player_id,
                    message: ClientMessage::JoinSession {
                        display_name: format!("Player{index}"),
                        session_id: session_id.clone(),
                    },
                })
                .unwrap();
        }
        commands
            .send(Command::Action {
                player_id: players[0],
                message: ClientMessage::StartSession {
                    session_id: session_id.clone(),
                },
            })
            .unwrap();
        let (reply, rx) = oneshot::channel();
        commands
            .send(Command::Inspect {
                session_id: session_id.clone(),
                reply,
            })
            .unwrap();
        let summary = rx.await.unwrap().unwrap();
        assert_eq!(summary.players.len(), 4);

        let clue_id = outbox
            .frames_for(players[0])
            .into_iter()
            .find_map(|frame| match frame {
                ServerMessage::BoardCreated { board, .. } => board
                    .values()
                    .flat_map(|column| column.iter())
                    .map(|clue| clue.id.clone())
                    .next(),
                _ => None,
            })
            .unwrap();
        commands
            .send(Command::Action {
                player_id: players[0],
                message: ClientMessage::ClueChosen {
                    session_id: session_id.clone(),
                    clue_id,
                },
            })
            .unwrap();

        let buzzers: Vec<_> = players
            .iter()
            .skip(1)
            .map(|player_id| {
                let commands = commands.clone();
                let player_id = *player_id;
                let session_id = session_id.clone();
                tokio::spawn(async move {
                    commands
                        .send(Command::Action {
                            player_id,
                            message: ClientMessage::BuzzIn { session_id },
                        })
                        .unwrap();
                })
            })
            .collect();
        for buzzer in buzzers {
            buzzer.await.unwrap();
        }
        let stats = round_trip(&commands).await;
        assert_eq!(stats, EngineStats { sessions: 1, players: 4 });

        let accepted: Vec<_> = outbox
            .frames_for(players[0])
            .into_iter()
            .filter_map(|frame| match frame {
                ServerMessage::PersonalTimerStarted { player_id } => Some(player_id),
                _ => None,
            })
            .collect();
        assert_eq!(accepted.len(), 1);
        assert!(players[1..].contains(&accepted[0]));

        drop(commands);
        dispatcher.await.unwrap();
    }

    #[test]
    fn unidentified_actions_are_dropped() {
        let outbox = Arc::new(RecordingOutbox::default());
        let mut engine = Engine::new(
            Arc::new(test_config()),
            Arc::new(test_corpus(5)),
            outbox.clone(),
            Arc::new(ManualScheduler::default()),
        );
        let stranger = Uuid::new_v4();
        engine.handle(Command::Action {
            player_id: stranger,
            message: ClientMessage::CreateSession {
                display_name: "Ghost".into(),
            },
        });
        assert_eq!(engine.registry().session_count(), 0);
        assert!(outbox.frames_for(stranger).is_empty());
    }

    #[test]
    fn inspect_reports_unknown_sessions_as_none() {
        let mut engine = Engine::new(
            Arc::new(test_config()),
            Arc::new(test_corpus(5)),
            Arc::new(RecordingOutbox::default()),
            Arc::new(ManualScheduler::default()),
        );
        let (reply, mut rx) = oneshot::channel();
        engine.handle(Command::Inspect {
            session_id: SessionId::parse("ZZZZZZ"),
            reply,
        });
        assert_eq!(rx.try_recv().unwrap().map(|summary| summary.id), None);
    }
}
