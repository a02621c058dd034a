//! Normalizers turning raw chat sources into ordered `ChatMessage`s
//!
//! Two encodings are supported:
//! - Plain-text transcripts, one `DD.MM.YYYY HH:MM:SS - username: message` per line
//! - JSON arrays of structured records carrying an explicit `offset`
//!
//! Transcript errors are fatal. Structured-record errors are logged and
//! produce an empty message set so a session can still start.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReplayError;
use crate::types::{ChatMessage, ChatTags, RawRecord};

/// Source token selecting live ingestion from the player connection
pub const LIVE_SOURCE: &str = "ondemand";

/// Encoding of a batch chat source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Txt,
    Json,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Txt => "txt",
            SourceFormat::Json => "json",
        }
    }

    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for SourceFormat {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(SourceFormat::Txt),
            "json" => Ok(SourceFormat::Json),
            other => Err(ReplayError::InvalidArgs(format!(
                "unknown chat format '{}'",
                other
            ))),
        }
    }
}

/// Where the messages of a session come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatSource {
    /// A file loaded once before synchronization starts
    File { path: PathBuf, format: SourceFormat },
    /// Records pushed by the player while the session runs
    Live,
}

impl ChatSource {
    /// Resolve a source argument, with an optional explicit format overriding
    /// the file extension
    pub fn resolve(arg: &str, format: Option<SourceFormat>) -> Result<Self, ReplayError> {
        if arg == LIVE_SOURCE {
            return Ok(ChatSource::Live);
        }
        let path = PathBuf::from(arg);
        let format = format
            .or_else(|| SourceFormat::from_path(&path))
            .ok_or_else(|| ReplayError::UnsupportedSource(arg.to_string()))?;
        Ok(ChatSource::File { path, format })
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ChatSource::Live)
    }
}

/// Normalize the text of a batch source
///
/// Transcript parse failures propagate; malformed JSON yields an empty set.
pub fn normalize(format: SourceFormat, text: &str) -> Result<Vec<ChatMessage>, ReplayError> {
    match format {
        SourceFormat::Txt => parse_transcript(text),
        SourceFormat::Json => Ok(normalize_records(text)),
    }
}

/// Parse a plain-text transcript
pub fn parse_transcript(text: &str) -> Result<Vec<ChatMessage>, ReplayError> {
    let mut messages = Vec::new();
    let mut start: Option<NaiveDateTime> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let (timestamp, username, content) = parse_transcript_line(line)
            .map_err(|reason| ReplayError::transcript_parse(line_no, reason))?;

        let start = *start.get_or_insert(timestamp);
        let time = (timestamp - start).num_milliseconds() as f64 / 1000.0;
        if let Some(prev) = messages.last().map(|m: &ChatMessage| m.time) {
            if time < prev {
                warn!(line = line_no, time, prev, "Transcript is not chronological");
            }
        }

        messages.push(ChatMessage::new(
            time,
            content,
            ChatTags::with_username(username),
        ));
    }

    debug!(count = messages.len(), "Parsed transcript");
    Ok(messages)
}

fn parse_transcript_line(line: &str) -> Result<(NaiveDateTime, &str, &str), String> {
    let (date_token, rest) = line
        .split_once(' ')
        .ok_or_else(|| "missing time token".to_string())?;
    let time_token = rest.split(' ').next().unwrap_or_default();

    let [day, month, year] = split_components(date_token, '.')
        .ok_or_else(|| format!("invalid date '{}'", date_token))?;
    let [hours, minutes, seconds] = split_components(time_token, ':')
        .ok_or_else(|| format!("invalid time '{}'", time_token))?;

    let timestamp = i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .and_then(|date| date.and_hms_opt(hours, minutes, seconds))
        .ok_or_else(|| format!("date out of range '{} {}'", date_token, time_token))?;

    // A bare trailing ':' is an empty message.
    let (head, content) = match line.split_once(": ") {
        Some(parts) => parts,
        None => line
            .strip_suffix(':')
            .map(|head| (head, ""))
            .ok_or_else(|| "missing ': ' before message".to_string())?,
    };
    let (_, username) = head
        .split_once(" - ")
        .ok_or_else(|| "missing ' - ' before username".to_string())?;

    Ok((timestamp, username, content))
}

fn split_components(token: &str, sep: char) -> Option<[u32; 3]> {
    let mut parts = token.split(sep).map(|p| p.parse::<u32>());
    let components = [
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
    ];
    if parts.next().is_some() {
        return None;
    }
    Some(components)
}

/// Parse a JSON array of structured records, failing on malformed input
pub fn parse_records(text: &str) -> Result<Vec<ChatMessage>, ReplayError> {
    let records: Vec<RawRecord> =
        serde_json::from_str(text).map_err(|e| ReplayError::RecordParse(e.to_string()))?;
    Ok(sort_by_offset(records.into_iter().map(ChatMessage::from).collect()))
}

/// Parse structured records; malformed input is logged and yields no messages
pub fn normalize_records(text: &str) -> Vec<ChatMessage> {
    match parse_records(text) {
        Ok(messages) => {
            debug!(count = messages.len(), "Parsed chat records");
            messages
        }
        Err(e) => {
            warn!("Ignoring chat records: {}", e);
            Vec::new()
        }
    }
}

/// Convert records pushed by the player in live mode
///
/// Records are kept in arrival order; a malformed batch is dropped as a whole.
pub fn normalize_live_records(data: serde_json::Value) -> Vec<ChatMessage> {
    match serde_json::from_value::<Vec<RawRecord>>(data) {
        Ok(records) => records.into_iter().map(ChatMessage::from).collect(),
        Err(e) => {
            warn!("Ignoring live chat records: {}", e);
            Vec::new()
        }
    }
}

/// Stable sort by time, warning when the input was not already ordered
fn sort_by_offset(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let ordered = messages.windows(2).all(|w| w[0].time <= w[1].time);
    if !ordered {
        warn!(
            count = messages.len(),
            "Chat records are not ordered by offset, sorting"
        );
        messages.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
    messages
}
