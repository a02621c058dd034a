//! Typed publish/subscribe fan-out for chat events

use std::collections::HashMap;
use std::fmt;

use crate::error::SubscriberError;
use crate::types::ChatMessage;

/// Event names subscribers can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Delete,
    Ready,
    Closing,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Delete => "delete",
            EventKind::Ready => "ready",
            EventKind::Closing => "closing",
        }
    }
}

/// Events delivered to the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A message whose time has elapsed
    Message(ChatMessage),
    /// Clear everything currently displayed
    Delete,
    /// The session is connected and synchronizing
    Ready,
    /// The session is shutting down; nothing follows
    Closing,
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::Message(_) => EventKind::Message,
            ChatEvent::Delete => EventKind::Delete,
            ChatEvent::Ready => EventKind::Ready,
            ChatEvent::Closing => EventKind::Closing,
        }
    }
}

/// Callback registered for one event kind
pub type Subscriber = Box<dyn FnMut(&ChatEvent) -> Result<(), SubscriberError> + Send>;

/// Subscribers keyed by event kind, invoked in subscription order
#[derive(Default)]
pub struct EventEmitter {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnMut(&ChatEvent) -> Result<(), SubscriberError> + Send + 'static,
    {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Deliver an event to every subscriber of its kind.
    ///
    /// Stops at the first failing subscriber and returns its error; the
    /// remaining subscribers are not called.
    pub fn publish(&mut self, event: &ChatEvent) -> Result<(), SubscriberError> {
        let Some(subscribers) = self.subscribers.get_mut(&event.kind()) else {
            return Ok(());
        };
        for subscriber in subscribers.iter_mut() {
            subscriber(event)?;
        }
        Ok(())
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Drop every subscription
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .subscribers
            .iter()
            .map(|(kind, subs)| (kind.as_str(), subs.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventEmitter")
            .field("subscribers", &counts)
            .finish()
    }
}
