use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReplayError;
use crate::sync::DEFAULT_REPLAY_WINDOW;

/// Pipe name mpv is conventionally started with
pub const DEFAULT_CHANNEL: &str = "MPVControllPipe";

/// Interval between playback position polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Player property holding the playback position in seconds
pub const DEFAULT_POSITION_PROPERTY: &str = "playback-time";

/// Session configuration, usually stored in `chatreplay.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayConfig {
    /// Messages replayed after a seek
    pub num_messages_on_refresh: Option<usize>,
    /// Playback position poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
    /// Named channel of the player IPC server
    pub channel: Option<String>,
    /// Property polled for the playback position
    pub position_property: Option<String>,
}

impl ReplayConfig {
    pub fn replay_window(&self) -> usize {
        self.num_messages_on_refresh.unwrap_or(DEFAULT_REPLAY_WINDOW)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero period would make the ticker spin.
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(1))
    }

    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(DEFAULT_CHANNEL)
    }

    pub fn position_property(&self) -> &str {
        self.position_property
            .as_deref()
            .unwrap_or(DEFAULT_POSITION_PROPERTY)
    }

    /// Values set in `other` take precedence
    pub fn merge(self, other: ReplayConfig) -> ReplayConfig {
        ReplayConfig {
            num_messages_on_refresh: other.num_messages_on_refresh.or(self.num_messages_on_refresh),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            channel: other.channel.or(self.channel),
            position_property: other.position_property.or(self.position_property),
        }
    }
}

/// Load config from a TOML file, returning defaults when it does not exist
pub fn load_config(path: &Path) -> Result<ReplayConfig, ReplayError> {
    if !path.exists() {
        return Ok(ReplayConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config: ReplayConfig = toml::from_str(&content)?;
    Ok(config)
}
