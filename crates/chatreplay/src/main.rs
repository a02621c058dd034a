//! chatreplay - replays a chat log in step with mpv playback
//!
//! The binary:
//! - Loads a plain-text or JSON chat log (or waits for live records)
//! - Connects to mpv's JSON IPC server
//! - Prints messages as playback passes them, replaying context on seeks
//! - Exits when the player closes

mod cli;
mod output;
mod session;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; stdout carries the chat itself.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("chatreplay starting");

    match session::run(&cli).await {
        Ok(exit) => info!(?exit, "chatreplay stopped"),
        Err(e) => {
            output::output_error(&cli, &e);
            std::process::exit(e.exit_code());
        }
    }
}
