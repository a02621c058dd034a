//! Wire types for the mpv JSON IPC protocol
//!
//! Every message is one JSON object per line. Requests carry a
//! `request_id` that mpv echoes in its reply; events carry an `event` name
//! and no `error` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IpcError;
use crate::notifications::PlayerNotification;

/// Reply status mpv uses for successful commands
pub const STATUS_SUCCESS: &str = "success";

/// A command sent to the player
#[derive(Debug, Clone, Serialize)]
pub struct MpvRequest {
    pub command: Vec<Value>,
    pub request_id: u64,
}

impl MpvRequest {
    pub fn new(command: Vec<Value>, request_id: u64) -> Self {
        Self {
            command,
            request_id,
        }
    }

    /// Build a `get_property` request
    pub fn get_property(name: &str, request_id: u64) -> Self {
        Self::new(
            vec![Value::from("get_property"), Value::from(name)],
            request_id,
        )
    }

    /// Serialize as a newline-terminated line
    pub fn to_line(&self) -> Result<String, IpcError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Any line received from the player
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MpvMessage {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    /// Arguments of `client-message` events
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A received line after classification
#[derive(Debug)]
pub enum Incoming {
    Reply {
        request_id: u64,
        result: Result<Value, IpcError>,
    },
    Notification(PlayerNotification),
    /// Events nobody subscribes to
    Ignored,
}

impl MpvMessage {
    pub fn parse(line: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn classify(self) -> Incoming {
        if let Some(event) = self.event {
            return match PlayerNotification::from_event(&event, self.data, self.args) {
                Some(notification) => Incoming::Notification(notification),
                None => Incoming::Ignored,
            };
        }

        let Some(status) = self.error else {
            return Incoming::Ignored;
        };
        let result = if status == STATUS_SUCCESS {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(IpcError::Player(status))
        };
        Incoming::Reply {
            // mpv answers requests without an id with 0
            request_id: self.request_id.unwrap_or(0),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_property_line() {
        let line = MpvRequest::get_property("playback-time", 7).to_line().unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"command": ["get_property", "playback-time"], "request_id": 7})
        );
    }

    #[test]
    fn test_classify_success_reply() {
        let msg = MpvMessage::parse(r#"{"data":12.5,"request_id":3,"error":"success"}"#).unwrap();
        match msg.classify() {
            Incoming::Reply { request_id, result } => {
                assert_eq!(request_id, 3);
                assert_eq!(result.unwrap(), serde_json::json!(12.5));
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_reply() {
        let msg = MpvMessage::parse(r#"{"request_id":4,"error":"property unavailable"}"#).unwrap();
        match msg.classify() {
            Incoming::Reply { request_id, result } => {
                assert_eq!(request_id, 4);
                assert!(matches!(result, Err(IpcError::Player(ref s)) if s == "property unavailable"));
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_events() {
        let seek = MpvMessage::parse(r#"{"event":"seek"}"#).unwrap();
        assert!(matches!(
            seek.classify(),
            Incoming::Notification(PlayerNotification::Seek)
        ));

        let other = MpvMessage::parse(r#"{"event":"playback-restart"}"#).unwrap();
        assert!(matches!(other.classify(), Incoming::Ignored));
    }
}
