//! Ordered in-memory message store

use tracing::warn;

use crate::types::ChatMessage;

/// Messages ordered ascending by `time`.
///
/// Batch sources are loaded once through [`MessageStore::from_messages`];
/// live sources grow through [`MessageStore::append`], which never re-sorts.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Time of the newest message, if any
    pub fn last_time(&self) -> Option<f64> {
        self.messages.last().map(|m| m.time)
    }

    /// Append a batch verbatim and return how many messages were added.
    ///
    /// Feeds must be non-decreasing in time; violations are logged but kept.
    pub fn append(&mut self, batch: Vec<ChatMessage>) -> usize {
        let mut prev = self.last_time();
        for message in &batch {
            if let Some(prev) = prev {
                if message.time < prev {
                    warn!(
                        time = message.time,
                        prev, "Appending out-of-order chat message"
                    );
                }
            }
            prev = Some(message.time);
        }
        let added = batch.len();
        self.messages.extend(batch);
        added
    }

    /// Whether the ascending-time invariant holds
    pub fn is_sorted(&self) -> bool {
        self.messages.windows(2).all(|w| w[0].time <= w[1].time)
    }

    /// Binary search by time.
    ///
    /// Returns the index of a message whose time equals `time` if one is hit
    /// during the search, otherwise the insertion point: the count of
    /// messages strictly earlier than `time`. Duplicates are not guaranteed to
    /// resolve to the leftmost match.
    pub fn locate(&self, time: f64) -> usize {
        let mut start = 0usize;
        let mut end = self.messages.len();

        // Half-open [start, end) keeps the bounds unsigned; the midpoint is
        // the same one a closed [start, end - 1] search would pick.
        while start < end {
            let mid = start + (end - 1 - start) / 2;
            let mid_time = self.messages[mid].time;
            if mid_time == time {
                return mid;
            }
            if mid_time < time {
                start = mid + 1;
            } else {
                end = mid;
            }
        }
        start
    }
}
