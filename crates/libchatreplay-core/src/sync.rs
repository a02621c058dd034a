//! Playback synchronizer
//!
//! Maps playback positions onto the ordered message store and emits the
//! incremental set of events the rendering layer needs:
//! - forward progress emits every message elapsed since the last pass
//! - a seek clears the display and replays a trailing window of messages

use tracing::debug;

use crate::emitter::{ChatEvent, EventEmitter, EventKind};
use crate::error::SubscriberError;
use crate::store::MessageStore;
use crate::types::ChatMessage;

/// Messages replayed after a seek when nothing else is configured
pub const DEFAULT_REPLAY_WINDOW: usize = 30;

/// Owns the message store, the emission cursor and the subscribers
#[derive(Debug)]
pub struct Synchronizer {
    store: MessageStore,
    /// Exclusive upper bound of messages already emitted
    cursor: usize,
    replay_window: usize,
    emitter: EventEmitter,
}

impl Synchronizer {
    pub fn new(store: MessageStore, replay_window: usize) -> Self {
        Self {
            store,
            cursor: 0,
            replay_window,
            emitter: EventEmitter::new(),
        }
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnMut(&ChatEvent) -> Result<(), SubscriberError> + Send + 'static,
    {
        self.emitter.subscribe(kind, callback);
    }

    /// Publish a lifecycle event such as `Ready` or `Closing`
    pub fn publish(&mut self, event: &ChatEvent) -> Result<(), SubscriberError> {
        self.emitter.publish(event)
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn replay_window(&self) -> usize {
        self.replay_window
    }

    pub fn locate(&self, time: f64) -> usize {
        self.store.locate(time)
    }

    /// Append live messages; they are emitted once playback passes them
    pub fn append(&mut self, batch: Vec<ChatMessage>) -> usize {
        self.store.append(batch)
    }

    /// Emit every message elapsed between the cursor and `time`.
    ///
    /// Returns the number of messages emitted. Time moving backward is a
    /// no-op. If a subscriber fails the cursor is left where it was.
    pub fn advance(&mut self, time: f64) -> Result<usize, SubscriberError> {
        let index = self.store.locate(time);
        if index <= self.cursor {
            return Ok(0);
        }

        for message in &self.store.messages()[self.cursor..index] {
            self.emitter.publish(&ChatEvent::Message(message.clone()))?;
        }
        let emitted = index - self.cursor;
        debug!(time, from = self.cursor, to = index, "Advanced");
        self.cursor = index;
        Ok(emitted)
    }

    /// Reposition after a seek: clear the display and replay up to
    /// `replay_window` messages leading up to `time`.
    ///
    /// Returns the number of messages replayed.
    pub fn seek(&mut self, time: f64) -> Result<usize, SubscriberError> {
        let index = self.store.locate(time);
        self.cursor = index.saturating_sub(self.replay_window);
        debug!(time, index, cursor = self.cursor, "Seeked");
        self.emitter.publish(&ChatEvent::Delete)?;
        self.advance(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatTags;
    use std::sync::{Arc, Mutex};

    fn store_with_times(times: &[f64]) -> MessageStore {
        MessageStore::from_messages(
            times
                .iter()
                .map(|&t| ChatMessage::new(t, format!("at {}", t), ChatTags::with_username("u")))
                .collect(),
        )
    }

    /// Record every event as a short string
    fn recorded(sync: &mut Synchronizer) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::Message, EventKind::Delete] {
            let log = Arc::clone(&log);
            sync.subscribe(kind, move |event| {
                let entry = match event {
                    ChatEvent::Message(m) => m.content.clone(),
                    other => other.kind().as_str().to_string(),
                };
                log.lock().unwrap().push(entry);
                Ok(())
            });
        }
        log
    }

    #[test]
    fn test_forward_playback() {
        let mut sync = Synchronizer::new(store_with_times(&[0.0, 5.0, 10.0]), 30);
        let log = recorded(&mut sync);

        assert_eq!(sync.advance(6.0).unwrap(), 2);
        assert_eq!(sync.cursor(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["at 0", "at 5"]);
    }

    #[test]
    fn test_backward_time_without_seek_is_noop() {
        let mut sync = Synchronizer::new(store_with_times(&[0.0, 5.0, 10.0]), 30);
        let log = recorded(&mut sync);

        sync.advance(11.0).unwrap();
        assert_eq!(sync.advance(1.0).unwrap(), 0);
        assert_eq!(sync.cursor(), 3);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_backward_seek_replays_window() {
        let mut sync = Synchronizer::new(store_with_times(&[0.0, 5.0, 10.0]), 1);
        let log = recorded(&mut sync);

        sync.advance(6.0).unwrap();
        log.lock().unwrap().clear();

        assert_eq!(sync.seek(2.0).unwrap(), 1);
        assert_eq!(sync.cursor(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["delete", "at 0"]);
    }

    #[test]
    fn test_seek_replay_count_is_bounded_by_window() {
        let times: Vec<f64> = (0..100).map(|i| i as f64).collect();
        for (target, expected) in [(0.5, 1), (10.5, 11), (50.5, 30), (1000.0, 30)] {
            let mut sync = Synchronizer::new(store_with_times(&times), 30);
            let log = recorded(&mut sync);

            assert_eq!(sync.seek(target).unwrap(), expected);
            let log = log.lock().unwrap();
            assert_eq!(log[0], "delete");
            assert_eq!(log.len(), expected + 1);
            assert_eq!(log.iter().filter(|e| *e == "delete").count(), 1);
        }
    }

    #[test]
    fn test_seek_on_empty_store_only_clears() {
        let mut sync = Synchronizer::new(MessageStore::new(), 30);
        let log = recorded(&mut sync);

        assert_eq!(sync.seek(42.0).unwrap(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["delete"]);
    }

    #[test]
    fn test_monotonic_samples_emit_store_prefix() {
        let times = [0.0, 0.0, 1.5, 3.0, 3.0, 3.0, 7.25, 8.0, 20.0];
        let mut sync = Synchronizer::new(store_with_times(&times), 30);
        let log = recorded(&mut sync);

        for sample in [0.0, 0.5, 2.0, 2.0, 3.5, 7.0, 9.0, 9.0, 15.0] {
            sync.advance(sample).unwrap();
        }

        let expected: Vec<String> = times[..sync.locate(15.0)]
            .iter()
            .map(|t| format!("at {}", t))
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
        assert_eq!(sync.cursor(), 8);
    }

    #[test]
    fn test_live_append_emitted_on_next_pass() {
        let mut sync = Synchronizer::new(MessageStore::new(), 30);
        let log = recorded(&mut sync);

        assert_eq!(sync.advance(5.0).unwrap(), 0);
        sync.append(vec![
            ChatMessage::new(4.0, "first", ChatTags::with_username("a")),
            ChatMessage::new(6.0, "second", ChatTags::with_username("b")),
        ]);
        assert_eq!(sync.advance(5.0).unwrap(), 1);
        assert_eq!(sync.advance(7.0).unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_subscriber_failure_keeps_cursor() {
        let mut sync = Synchronizer::new(store_with_times(&[0.0, 5.0, 10.0]), 30);
        let fail = Arc::new(Mutex::new(true));
        let flag = Arc::clone(&fail);
        sync.subscribe(EventKind::Message, move |_| {
            if *flag.lock().unwrap() {
                Err(SubscriberError::new("renderer gone"))
            } else {
                Ok(())
            }
        });

        assert!(sync.advance(6.0).is_err());
        assert_eq!(sync.cursor(), 0);

        *fail.lock().unwrap() = false;
        assert_eq!(sync.advance(6.0).unwrap(), 2);
        assert_eq!(sync.cursor(), 2);
    }
}
