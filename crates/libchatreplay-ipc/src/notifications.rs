//! Notification types pushed by the player
//!
//! The player emits these asynchronously. Events without a mapping here
//! are ignored.

use serde_json::Value;
use tracing::trace;

/// Name of the event carrying live chat records
pub const CHAT_MESSAGES_EVENT: &str = "chatmessages";

/// Notifications the playback tracker reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotification {
    /// Playback jumped to a new position
    Seek,

    /// The player is shutting down or the connection dropped
    Close,

    /// New chat records for live mode
    ChatMessages {
        /// Event name the records arrived under
        event: String,
        /// Raw structured records, normally a JSON array
        data: Value,
    },
}

impl PlayerNotification {
    /// Get the notification type as a string (for logging)
    pub fn notification_type(&self) -> &'static str {
        match self {
            PlayerNotification::Seek => "Seek",
            PlayerNotification::Close => "Close",
            PlayerNotification::ChatMessages { .. } => "ChatMessages",
        }
    }

    /// Map a player event onto a notification.
    ///
    /// Live records arrive either as a `chatmessages` event with a `data`
    /// array, or as a `client-message` whose first argument is
    /// `chatmessages` and whose second is the records as a JSON string.
    pub fn from_event(event: &str, data: Option<Value>, args: Vec<Value>) -> Option<Self> {
        match event {
            "seek" => Some(PlayerNotification::Seek),
            "shutdown" => Some(PlayerNotification::Close),
            CHAT_MESSAGES_EVENT => Some(PlayerNotification::ChatMessages {
                event: event.to_string(),
                data: data.unwrap_or(Value::Null),
            }),
            "client-message" => {
                let mut args = args.into_iter();
                match args.next() {
                    Some(Value::String(name)) if name == CHAT_MESSAGES_EVENT => {
                        let data = match args.next() {
                            Some(Value::String(raw)) => {
                                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
                            }
                            Some(other) => other,
                            None => Value::Null,
                        };
                        Some(PlayerNotification::ChatMessages { event: name, data })
                    }
                    _ => None,
                }
            }
            other => {
                trace!(event = other, "Ignoring player event");
                None
            }
        }
    }
}
