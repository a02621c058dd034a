use std::path::PathBuf;

use thiserror::Error;

/// Main error type for chatreplay operations
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("cannot read chat source {}: {source}", path.display())]
    SourceAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported chat source '{0}' (expected a .txt or .json file, or 'ondemand')")]
    UnsupportedSource(String),

    #[error("transcript line {line}: {reason}")]
    TranscriptParse { line: usize, reason: String },

    #[error("malformed chat records: {0}")]
    RecordParse(String),

    #[error("player connection error: {0}")]
    Connection(String),

    #[error("subscriber error: {0}")]
    Subscriber(#[from] SubscriberError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error returned by an event subscriber.
///
/// The emitter does not catch these; they abort the publish that raised them.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        SubscriberError(message.into())
    }
}

impl ReplayError {
    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            ReplayError::InvalidArgs(_) => "invalid_args",
            ReplayError::SourceAccess { .. } => "source_access",
            ReplayError::UnsupportedSource(_) => "invalid_args",
            ReplayError::TranscriptParse { .. } => "parse_error",
            ReplayError::RecordParse(_) => "parse_error",
            ReplayError::Connection(_) => "connection_error",
            ReplayError::Subscriber(_) => "subscriber_error",
            ReplayError::Io(_) => "io_error",
            ReplayError::Json(_) => "parse_error",
            ReplayError::TomlParse(_) => "invalid_config",
            ReplayError::Internal(_) => "internal_error",
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            ReplayError::InvalidArgs(_) => 2,
            ReplayError::UnsupportedSource(_) => 2,
            ReplayError::TomlParse(_) => 2,
            ReplayError::SourceAccess { .. } => 3,
            ReplayError::TranscriptParse { .. } => 4,
            ReplayError::RecordParse(_) => 4,
            ReplayError::Json(_) => 4,
            ReplayError::Io(_) => 5,
            ReplayError::Connection(_) => 6,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            ReplayError::SourceAccess { .. } => vec![
                "Check that the chat log path exists and is readable",
                "Use '--chatlog ondemand' to receive messages from the player instead",
            ],
            ReplayError::UnsupportedSource(_) => vec![
                "Pass '--format txt' or '--format json' to select the parser explicitly",
            ],
            ReplayError::TranscriptParse { .. } => vec![
                "Transcript lines must look like 'DD.MM.YYYY HH:MM:SS - username: message'",
            ],
            ReplayError::Connection(_) => vec![
                "Start mpv with '--input-ipc-server=<pipename>'",
                "Make sure '--pipename' matches the player's IPC server name",
            ],
            _ => vec![],
        }
    }

    /// Create a SourceAccess error for a path
    pub fn source_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReplayError::SourceAccess {
            path: path.into(),
            source,
        }
    }

    /// Create a TranscriptParse error for a 1-based line number
    pub fn transcript_parse(line: usize, reason: impl Into<String>) -> Self {
        ReplayError::TranscriptParse {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_init_failures() {
        let access = ReplayError::source_access(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let parse = ReplayError::transcript_parse(3, "bad date");

        assert_eq!(access.exit_code(), 3);
        assert_eq!(parse.exit_code(), 4);
        assert_eq!(access.error_code(), "source_access");
        assert!(parse.to_string().contains("line 3"));
        assert!(!access.suggestions().is_empty());
    }
}
