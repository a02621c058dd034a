//! Session bootstrap: load the chat source, connect to the player and run
//! the playback tracker until the player goes away.

use libchatreplay_core::{
    load_config, normalize, ChatSource, MessageStore, ReplayConfig, ReplayError, Synchronizer,
};
use libchatreplay_ipc::{MpvClient, PlaybackTracker, TrackerConfig, TrackerExit};
use tracing::info;

use crate::cli::Cli;
use crate::output;

/// Merge the config file (if any) with command-line overrides
pub fn resolve_config(cli: &Cli) -> Result<ReplayConfig, ReplayError> {
    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => ReplayConfig::default(),
    };
    Ok(file.merge(cli.config_overrides()))
}

/// Materialize the message store for a source.
///
/// Live sources start empty and fill up from player notifications.
pub async fn load_store(source: &ChatSource) -> Result<MessageStore, ReplayError> {
    match source {
        ChatSource::File { path, format } => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ReplayError::source_access(path.clone(), e))?;
            let messages = normalize(*format, &text)?;
            info!(
                path = %path.display(),
                format = format.as_str(),
                messages = messages.len(),
                "Loaded chat log"
            );
            Ok(MessageStore::from_messages(messages))
        }
        ChatSource::Live => {
            info!("Waiting for chat records from the player");
            Ok(MessageStore::new())
        }
    }
}

/// Run one session to completion
pub async fn run(cli: &Cli) -> Result<TrackerExit, ReplayError> {
    let config = resolve_config(cli)?;
    let source = ChatSource::resolve(&cli.chatlog, cli.format.map(Into::into))?;
    let store = load_store(&source).await?;

    let mut sync = Synchronizer::new(store, config.replay_window());
    output::attach_printer(&mut sync, cli.json);

    let (client, notifications) = MpvClient::connect(config.channel()).await?;
    info!(endpoint = %client.endpoint(), "Connected to player");

    let tracker = PlaybackTracker::new(
        client,
        sync,
        TrackerConfig::from_replay_config(&config, source.is_live()),
    );
    Ok(tracker.run(notifications, shutdown_signal()).await)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
