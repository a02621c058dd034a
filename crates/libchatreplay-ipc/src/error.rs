//! IPC error types

use thiserror::Error;

/// Errors that can occur while talking to the player
#[derive(Error, Debug)]
pub enum IpcError {
    /// Connection failed
    #[error("Connection to {endpoint} failed: {message}")]
    ConnectionFailed { endpoint: String, message: String },

    /// Nothing is listening on the endpoint
    #[error("Player not running at {0}")]
    PlayerNotRunning(String),

    /// The connection dropped before a reply arrived
    #[error("Player connection closed")]
    ConnectionClosed,

    /// The player answered with an error status
    #[error("Player error: {0}")]
    Player(String),

    /// A property had an unexpected type or value
    #[error("Unexpected value for {property}: {value}")]
    UnexpectedValue { property: String, value: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IpcError {
    /// Whether the error means the player is gone for good
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            IpcError::ConnectionClosed | IpcError::PlayerNotRunning(_)
        )
    }
}

impl From<IpcError> for libchatreplay_core::ReplayError {
    fn from(e: IpcError) -> Self {
        libchatreplay_core::ReplayError::Connection(e.to_string())
    }
}
