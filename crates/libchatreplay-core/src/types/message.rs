use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-message annotations handed to the rendering layer.
///
/// Emotes and badges are reshaped from their raw form but never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTags {
    pub username: String,
    pub color: Option<String>,
    /// Emote id -> character spans as `"begin-end"`, in source order
    #[serde(default)]
    pub emotes: BTreeMap<String, Vec<String>>,
    /// Badge id -> version
    #[serde(default)]
    pub badges: BTreeMap<String, String>,
}

impl ChatTags {
    /// Tags carrying only a username, as produced by plain-text transcripts
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

/// A single chat message positioned on the playback timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Seconds elapsed since the start of the session
    pub time: f64,
    pub content: String,
    pub tags: ChatTags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl ChatMessage {
    pub fn new(time: f64, content: impl Into<String>, tags: ChatTags) -> Self {
        Self {
            time,
            content: content.into(),
            tags,
            channel_id: None,
        }
    }

    pub fn with_channel(mut self, channel_id: Option<String>) -> Self {
        self.channel_id = channel_id;
        self
    }

    pub fn username(&self) -> &str {
        &self.tags.username
    }
}
