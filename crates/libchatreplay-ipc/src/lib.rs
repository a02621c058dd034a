//! Player IPC and playback tracking for chatreplay
//!
//! This crate provides:
//! - The player connection seam (PlayerConnection)
//! - An mpv JSON IPC client (MpvClient)
//! - Wire message and notification types
//! - The playback tracker driving the synchronizer

pub mod client;
pub mod connection;
pub mod error;
pub mod messages;
pub mod notifications;
pub mod tracker;

pub use client::{resolve_endpoint, MpvClient};
pub use connection::PlayerConnection;
pub use error::IpcError;
pub use notifications::PlayerNotification;
pub use tracker::{PlaybackTracker, TrackerConfig, TrackerExit};
