pub mod board;
pub mod connections;
pub mod registry;
pub mod session;
pub mod session_id;
pub mod state_machine;
pub mod timeout;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ServiceError, services::engine::Command, state::connections::ConnectionHub};

/// Identifier of a player, stable across reconnects within the grace period.
pub type PlayerId = Uuid;

/// Handle cloned into every axum handler.
pub type SharedState = Arc<AppState>;
/// Upper bound on how long a read-only query waits for the engine.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles shared by HTTP and WebSocket handlers.
///
/// Session data lives inside the engine task; this state only carries the
/// channel that feeds it and the sockets it writes to.
pub struct AppState {
    connections: Arc<ConnectionHub>,
    commands: mpsc::UnboundedSender<Command>,
    query_timeout: Duration,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        connections: Arc<ConnectionHub>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> SharedState {
        Arc::new(Self {
            connections,
            commands,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        })
    }

    /// Live player sockets.
    pub fn connections(&self) -> &ConnectionHub {
        &self.connections
    }

    /// Queue a command for the engine.
    pub fn dispatch(&self, command: Command) -> Result<(), ServiceError> {
        self.commands.send(command).map_err(|_| {
            warn!("engine channel closed");
            ServiceError::Unavailable
        })
    }

    /// Ask the engine a question and wait for its reply.
    pub async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(build(reply))?;
        match timeout(self.query_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ServiceError::Unavailable),
            Err(_) => {
                warn!(timeout = ?self.query_timeout, "engine query timed out");
                Err(ServiceError::Timeout)
            }
        }
    }
}
