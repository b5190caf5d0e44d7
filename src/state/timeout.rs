//! Cancellable delayed actions bounding every waiting period of a session.
//!
//! A [`Timeout`] never runs game logic itself: when it elapses it posts a
//! [`TimerFired`] back onto the engine's command channel. The engine only acts
//! on a firing whose token still matches the handle stored on the session, so a
//! firing that races a cancellation is dropped.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::mpsc, task::AbortHandle};

use crate::{
    services::engine::Command,
    state::{PlayerId, session_id::SessionId},
};

/// Unique token distinguishing successive timeouts.
pub type TimerToken = u64;

/// Waiting periods owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTimer {
    /// Anyone may still buzz.
    BuzzWindow,
    /// The buzzed player must answer.
    AnswerWindow,
    /// Short pause before the follow-up buzz window opens.
    ReopenDelay,
}

/// What a timeout is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTarget {
    /// A session-level waiting period.
    Session {
        /// Session owning the timer.
        session_id: SessionId,
        /// Which of the session's periods elapsed.
        timer: SessionTimer,
    },
    /// Grace period granted to a disconnected player.
    DisconnectGrace {
        /// Player that dropped.
        player_id: PlayerId,
    },
}

/// Notification that a timeout elapsed (or was force-fired).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    /// What the timeout was bound to.
    pub target: TimerTarget,
    /// Token of the timeout that fired.
    pub token: TimerToken,
}

const PENDING: u8 = 0;
const CANCELLED: u8 = 1;
const FIRED: u8 = 2;

/// Shared settle-once flag between a [`Timeout`] and the task driving it.
#[derive(Debug, Default)]
pub struct TimerState(AtomicU8);

impl TimerState {
    /// Settle as fired. Returns `false` if the timeout was already settled.
    pub fn try_fire(&self) -> bool {
        self.settle(FIRED)
    }

    fn try_cancel(&self) -> bool {
        self.settle(CANCELLED)
    }

    fn settle(&self, outcome: u8) -> bool {
        self.0
            .compare_exchange(PENDING, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the timeout has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }
}

/// Handle to a scheduled delayed action.
pub struct Timeout {
    fired: TimerFired,
    state: Arc<TimerState>,
    abort: Option<AbortHandle>,
}

impl Timeout {
    /// Wrap the pieces produced by a [`TimerScheduler`].
    pub fn new(fired: TimerFired, state: Arc<TimerState>, abort: Option<AbortHandle>) -> Self {
        Self {
            fired,
            state,
            abort,
        }
    }

    /// Token identifying this timeout.
    pub fn token(&self) -> TimerToken {
        self.fired.token
    }

    /// What this timeout is bound to.
    #[cfg(test)]
    pub fn target(&self) -> &TimerTarget {
        &self.fired.target
    }

    /// Whether the timeout is still waiting.
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Prevent the timeout from firing. Safe to call repeatedly or after it fired.
    pub fn cancel(&self) {
        if self.state.try_cancel()
            && let Some(abort) = &self.abort
        {
            abort.abort();
        }
    }

    /// Fire now instead of waiting.
    ///
    /// Returns the notification the caller must handle immediately, or `None`
    /// when the timeout was already cancelled or fired.
    pub fn force_fire(&self) -> Option<TimerFired> {
        if !self.state.try_fire() {
            return None;
        }
        if let Some(abort) = &self.abort {
            abort.abort();
        }
        Some(self.fired.clone())
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("target", &self.fired.target)
            .field("token", &self.fired.token)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Source of timeouts used by the engine.
pub trait TimerScheduler: Send + Sync {
    /// Schedule a notification for `target` after `delay`.
    fn schedule(&self, target: TimerTarget, delay: Duration) -> Timeout;
}

/// Scheduler backed by tokio tasks that post firings onto the engine channel.
pub struct TokioScheduler {
    commands: mpsc::UnboundedSender<Command>,
    next_token: AtomicU64,
}

impl TokioScheduler {
    /// Build a scheduler delivering firings to `commands`.
    pub fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            commands,
            next_token: AtomicU64::new(1),
        }
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, target: TimerTarget, delay: Duration) -> Timeout {
        let fired = TimerFired {
            target,
            token: self.next_token.fetch_add(1, Ordering::Relaxed),
        };
        let state = Arc::new(TimerState::default());

        let task_state = state.clone();
        let task_fired = fired.clone();
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_state.try_fire() {
                let _ = commands.send(Command::Timer(task_fired));
            }
        });

        Timeout::new(fired, state, Some(task.abort_handle()))
    }
}
