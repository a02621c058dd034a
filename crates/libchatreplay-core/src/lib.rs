//! Core library for chatreplay
//!
//! Replays a timestamped chat log in step with a media player's playback
//! position. This crate holds the player-independent parts:
//! - The chat message model and structured record reshaping
//! - Normalizers for plain-text transcripts and JSON records
//! - The time-ordered message store
//! - The synchronizer deciding which messages to emit or replay
//! - The event emitter feeding the rendering layer

pub mod config;
pub mod emitter;
pub mod error;
pub mod normalize;
pub mod store;
pub mod sync;
pub mod types;

pub use config::{load_config, ReplayConfig};
pub use emitter::{ChatEvent, EventEmitter, EventKind};
pub use error::{ReplayError, SubscriberError};
pub use normalize::{normalize, ChatSource, SourceFormat, LIVE_SOURCE};
pub use store::MessageStore;
pub use sync::{Synchronizer, DEFAULT_REPLAY_WINDOW};
pub use types::{ChatMessage, ChatTags, RawRecord};
