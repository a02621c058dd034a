use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libchatreplay_core::{ReplayConfig, SourceFormat};

#[derive(Parser)]
#[command(
    name = "chatreplay",
    about = "Replay a chat log in sync with mpv playback",
    version
)]
pub struct Cli {
    /// Chat log to replay (.txt or .json), or 'ondemand' for records pushed by the player
    #[arg(long)]
    pub chatlog: String,

    /// Player IPC server name or socket path (default: MPVControllPipe)
    #[arg(long)]
    pub pipename: Option<String>,

    /// Parse the chat log as this format instead of guessing from the extension
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Messages replayed after seeking (default: 30)
    #[arg(long)]
    pub replay_window: Option<usize>,

    /// Playback position poll interval in milliseconds (default: 2000)
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output events and errors as JSON
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Txt,
    Json,
}

impl From<FormatArg> for SourceFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Txt => SourceFormat::Txt,
            FormatArg::Json => SourceFormat::Json,
        }
    }
}

impl Cli {
    /// Config values given as flags
    pub fn config_overrides(&self) -> ReplayConfig {
        ReplayConfig {
            num_messages_on_refresh: self.replay_window,
            poll_interval_ms: self.poll_interval_ms,
            channel: self.pipename.clone(),
            position_property: None,
        }
    }
}
