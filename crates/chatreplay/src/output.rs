//! Event printing and error reporting

use std::io::Write;

use libchatreplay_core::{ChatEvent, EventKind, ReplayError, SubscriberError, Synchronizer};
use serde::Serialize;

use crate::cli::Cli;

/// JSON error envelope
#[derive(Serialize)]
pub struct JsonError {
    pub ok: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<&'static str>,
}

/// Render one event as a line of output
pub fn format_event(event: &ChatEvent, json: bool) -> String {
    if json {
        let value = match event {
            ChatEvent::Message(message) => serde_json::json!({
                "event": event.kind().as_str(),
                "time": message.time,
                "tags": message.tags,
                "content": message.content,
                "channel_id": message.channel_id,
            }),
            other => serde_json::json!({ "event": other.kind().as_str() }),
        };
        return value.to_string();
    }

    match event {
        ChatEvent::Message(message) => format!("{}: {}", message.tags.username, message.content),
        ChatEvent::Delete => "--- cleared ---".to_string(),
        ChatEvent::Ready => "--- connected ---".to_string(),
        ChatEvent::Closing => "--- player closed ---".to_string(),
    }
}

/// Print every event the synchronizer emits to stdout
pub fn attach_printer(sync: &mut Synchronizer, json: bool) {
    for kind in [
        EventKind::Message,
        EventKind::Delete,
        EventKind::Ready,
        EventKind::Closing,
    ] {
        sync.subscribe(kind, move |event| {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", format_event(event, json))
                .and_then(|_| stdout.flush())
                .map_err(|e| SubscriberError::new(format!("stdout: {}", e)))
        });
    }
}

/// Output an error
pub fn output_error(cli: &Cli, err: &ReplayError) {
    if cli.json {
        let response = JsonError {
            ok: false,
            code: err.error_code().to_string(),
            message: err.to_string(),
            suggestions: err.suggestions(),
        };
        match serde_json::to_string_pretty(&response) {
            Ok(text) => eprintln!("{}", text),
            Err(_) => eprintln!("error: {}", err),
        }
    } else {
        eprintln!("error: {}", err);
        let suggestions = err.suggestions();
        if !suggestions.is_empty() {
            eprintln!();
            eprintln!("Suggestions:");
            for suggestion in suggestions {
                eprintln!("  - {}", suggestion);
            }
        }
    }
}
