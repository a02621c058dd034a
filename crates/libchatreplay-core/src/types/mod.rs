pub mod message;
pub mod record;

pub use message::{ChatMessage, ChatTags};
pub use record::{RawBadge, RawEmote, RawRecord};
