//! Structured chat records as exported by chat downloaders and pushed by
//! the player in live mode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, ChatTags};

/// One emote occurrence inside a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmote {
    #[serde(rename = "_id")]
    pub id: String,
    pub begin: u32,
    pub end: u32,
}

/// One badge shown next to the author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBadge {
    #[serde(rename = "_id")]
    pub id: String,
    pub version: String,
}

/// A structured chat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub content: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub author_displayname: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub emotes: Vec<RawEmote>,
    #[serde(default)]
    pub badges: Vec<RawBadge>,
    /// Wall-clock time of the original message; kept for completeness only
    #[serde(default)]
    pub datetime: Option<String>,
    /// Seconds since the start of the stream
    pub offset: f64,
}

/// Group emote spans by id, keeping the order they appear in
pub fn aggregate_emotes(emotes: &[RawEmote]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for emote in emotes {
        grouped
            .entry(emote.id.clone())
            .or_default()
            .push(format!("{}-{}", emote.begin, emote.end));
    }
    grouped
}

/// Group badges by id; the first version seen for an id wins
pub fn aggregate_badges(badges: &[RawBadge]) -> BTreeMap<String, String> {
    let mut grouped = BTreeMap::new();
    for badge in badges {
        grouped
            .entry(badge.id.clone())
            .or_insert_with(|| badge.version.clone());
    }
    grouped
}

impl From<RawRecord> for ChatMessage {
    fn from(record: RawRecord) -> Self {
        let tags = ChatTags {
            username: record.author_displayname,
            color: record.color,
            emotes: aggregate_emotes(&record.emotes),
            badges: aggregate_badges(&record.badges),
        };
        ChatMessage::new(record.offset, record.content, tags).with_channel(record.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(id: &str, version: &str) -> RawBadge {
        RawBadge {
            id: id.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_badge_first_version_wins() {
        let badges = aggregate_badges(&[badge("a", "1"), badge("a", "2")]);
        assert_eq!(badges.len(), 1);
        assert_eq!(badges["a"], "1");
    }

    #[test]
    fn test_emotes_grouped_in_source_order() {
        let emotes = aggregate_emotes(&[
            RawEmote {
                id: "x".to_string(),
                begin: 0,
                end: 3,
            },
            RawEmote {
                id: "y".to_string(),
                begin: 5,
                end: 8,
            },
            RawEmote {
                id: "x".to_string(),
                begin: 10,
                end: 13,
            },
        ]);
        assert_eq!(emotes["x"], vec!["0-3", "10-13"]);
        assert_eq!(emotes["y"], vec!["5-8"]);
    }

    #[test]
    fn test_record_into_message() {
        let record: RawRecord = serde_json::from_str(
            r##"{
                "content": "Kappa hello",
                "channel_id": "12345",
                "author_displayname": "alice",
                "color": "#FF0000",
                "emotes": [{"_id": "25", "begin": 0, "end": 4}],
                "badges": [{"_id": "subscriber", "version": "12"}],
                "datetime": "2020-01-01T10:00:00Z",
                "offset": 12.5
            }"##,
        )
        .unwrap();

        let message = ChatMessage::from(record);
        assert_eq!(message.time, 12.5);
        assert_eq!(message.content, "Kappa hello");
        assert_eq!(message.channel_id.as_deref(), Some("12345"));
        assert_eq!(message.tags.username, "alice");
        assert_eq!(message.tags.color.as_deref(), Some("#FF0000"));
        assert_eq!(message.tags.emotes["25"], vec!["0-4"]);
        assert_eq!(message.tags.badges["subscriber"], "12");
    }

    #[test]
    fn test_record_optional_fields_default() {
        let record: RawRecord = serde_json::from_str(
            r#"{"content": "hi", "author_displayname": "bob", "color": null, "offset": 3}"#,
        )
        .unwrap();
        assert!(record.emotes.is_empty());
        assert!(record.badges.is_empty());
        assert_eq!(record.channel_id, None);
        assert_eq!(record.offset, 3.0);
    }
}
