//! Application-level configuration loading, including game timings and lobby limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLUEBOARD_BACK_CONFIG_PATH";
/// Default location of the processed clue corpus.
const DEFAULT_CORPUS_PATH: &str = "data/clues.json";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Durations bounding every waiting period of a session.
pub struct GameTimings {
    /// Window during which anyone may buzz after a clue is revealed.
    pub buzz_window: Duration,
    /// Time the buzzed player has to submit an answer.
    pub answer_window: Duration,
    /// Shortened window reopened after a wrong answer or a timeout.
    pub follow_up_window: Duration,
    /// Pause before the follow-up window opens so the last status stays visible.
    pub reopen_delay: Duration,
    /// How long a disconnected player is kept before being removed.
    pub disconnect_grace: Duration,
}

impl Default for GameTimings {
    fn default() -> Self {
        Self {
            buzz_window: Duration::from_millis(10_000),
            answer_window: Duration::from_millis(5_000),
            follow_up_window: Duration::from_millis(3_000),
            reopen_delay: Duration::from_millis(1_000),
            disconnect_grace: Duration::from_millis(1_000),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Path of the JSON clue corpus.
    pub corpus_path: PathBuf,
    /// Longest accepted display name, in characters.
    pub max_name_length: usize,
    /// Number of categories placed on each round's board.
    pub categories_per_round: usize,
    /// Timeout cascade durations.
    pub timings: GameTimings,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        corpus = %app_config.corpus_path.display(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    corpus_path: String,
    max_name_length: usize,
    categories_per_round: usize,
    buzz_window_ms: u64,
    answer_window_ms: u64,
    follow_up_window_ms: u64,
    reopen_delay_ms: u64,
    disconnect_grace_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        let timings = GameTimings::default();
        Self {
            corpus_path: DEFAULT_CORPUS_PATH.into(),
            max_name_length: 19,
            categories_per_round: 6,
            buzz_window_ms: millis(timings.buzz_window),
            answer_window_ms: millis(timings.answer_window),
            follow_up_window_ms: millis(timings.follow_up_window),
            reopen_delay_ms: millis(timings.reopen_delay),
            disconnect_grace_ms: millis(timings.disconnect_grace),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            corpus_path: PathBuf::from(value.corpus_path),
            max_name_length: value.max_name_length.max(1),
            categories_per_round: value.categories_per_round.max(1),
            timings: GameTimings {
                buzz_window: Duration::from_millis(value.buzz_window_ms),
                answer_window: Duration::from_millis(value.answer_window_ms),
                follow_up_window: Duration::from_millis(value.follow_up_window_ms),
                reopen_delay: Duration::from_millis(value.reopen_delay_ms),
                disconnect_grace: Duration::from_millis(value.disconnect_grace_ms),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
