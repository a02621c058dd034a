//! Playback tracker - drives the synchronizer from a player connection
//!
//! The tracker:
//! - Primes the session with a seek pass at the current position
//! - Polls the playback position on a steady ticker
//! - Replays around the new position on seek notifications
//! - Appends pushed records in live mode
//! - Tears everything down when the player closes
//!
//! Position requests run as separate tasks so notifications keep flowing
//! while a round trip is outstanding. Each seek starts a new generation;
//! replies from an older generation are dropped, so a slow poll can never
//! undo a seek that overtook it.

use std::future::Future;
use std::time::Duration;

use libchatreplay_core::normalize::normalize_live_records;
use libchatreplay_core::{ChatEvent, ReplayConfig, Synchronizer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::connection::{position_from_value, PlayerConnection};
use crate::error::IpcError;
use crate::notifications::PlayerNotification;

/// Tracker settings
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub position_property: String,
    /// Accept records pushed by the player
    pub live: bool,
}

impl TrackerConfig {
    pub fn from_replay_config(config: &ReplayConfig, live: bool) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            position_property: config.position_property().to_string(),
            live,
        }
    }
}

/// Why the tracker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerExit {
    /// The player closed or the connection dropped
    PlayerClosed,
    /// The host asked us to stop
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Advance,
    Seek,
}

impl Pass {
    fn as_str(&self) -> &'static str {
        match self {
            Pass::Advance => "advance",
            Pass::Seek => "seek",
        }
    }
}

struct PositionReply {
    generation: u64,
    pass: Pass,
    result: Result<f64, IpcError>,
}

/// Bridges a player connection to a [`Synchronizer`]
pub struct PlaybackTracker<C: PlayerConnection> {
    conn: C,
    sync: Synchronizer,
    config: TrackerConfig,
    /// Bumped on every seek; older replies are stale
    generation: u64,
    seek_in_flight: bool,
    /// The last seek pass got no position; redo it instead of advancing
    resync_pending: bool,
    advance_request: Option<JoinHandle<()>>,
    seek_request: Option<JoinHandle<()>>,
    replies_tx: mpsc::UnboundedSender<PositionReply>,
    replies_rx: mpsc::UnboundedReceiver<PositionReply>,
}

impl<C: PlayerConnection> PlaybackTracker<C> {
    pub fn new(conn: C, sync: Synchronizer, config: TrackerConfig) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            conn,
            sync,
            config,
            generation: 0,
            seek_in_flight: false,
            resync_pending: false,
            advance_request: None,
            seek_request: None,
            replies_tx,
            replies_rx,
        }
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    /// Run until the player closes or `shutdown` resolves
    pub async fn run<F>(
        mut self,
        mut notifications: mpsc::UnboundedReceiver<PlayerNotification>,
        shutdown: F,
    ) -> TrackerExit
    where
        F: Future<Output = ()>,
    {
        info!(
            messages = self.sync.store().len(),
            live = self.config.live,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Playback tracker starting"
        );

        // Behave as if playback had just jumped to wherever the player is.
        self.request_position(Pass::Seek);
        self.publish_lifecycle(ChatEvent::Ready);

        let period = self.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let exit = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break TrackerExit::Shutdown;
                }
                _ = ticker.tick() => {
                    if self.seek_in_flight || self.resync_pending {
                        // A seek pass that stalled or failed is redone in place of the poll.
                        trace!(stalled = self.seek_in_flight, "Reissuing seek pass");
                        self.request_position(Pass::Seek);
                    } else {
                        self.request_position(Pass::Advance);
                    }
                }
                notification = notifications.recv() => match notification {
                    Some(PlayerNotification::Seek) => self.on_seek(),
                    Some(PlayerNotification::ChatMessages { event, data }) => {
                        self.on_records(&event, data);
                    }
                    Some(PlayerNotification::Close) | None => {
                        info!("Player closed");
                        break TrackerExit::PlayerClosed;
                    }
                },
                Some(reply) = self.replies_rx.recv() => self.on_reply(reply),
            }
        };

        self.teardown(notifications);
        exit
    }

    fn on_seek(&mut self) {
        self.generation += 1;
        debug!(generation = self.generation, "Player seeked");
        self.cancel_requests();
        self.request_position(Pass::Seek);
    }

    fn on_records(&mut self, event: &str, data: serde_json::Value) {
        if !self.config.live {
            debug!(event, "Ignoring pushed chat records outside live mode");
            return;
        }
        let messages = normalize_live_records(data);
        let added = self.sync.append(messages);
        debug!(event, added, total = self.sync.store().len(), "Appended live chat records");
    }

    fn on_reply(&mut self, reply: PositionReply) {
        if reply.generation != self.generation {
            debug!(
                pass = reply.pass.as_str(),
                generation = reply.generation,
                current = self.generation,
                "Discarding stale position reply"
            );
            return;
        }
        if reply.pass == Pass::Seek {
            self.seek_in_flight = false;
        }

        let time = match reply.result {
            Ok(time) => time,
            Err(e) if e.is_disconnect() => {
                debug!("Position request lost with the connection");
                return;
            }
            Err(e) => {
                debug!(pass = reply.pass.as_str(), "Playback position unavailable: {}", e);
                if reply.pass == Pass::Seek {
                    self.resync_pending = true;
                }
                return;
            }
        };
        if reply.pass == Pass::Seek {
            self.resync_pending = false;
        }

        let result = match reply.pass {
            Pass::Advance => self.sync.advance(time),
            Pass::Seek => self.sync.seek(time),
        };
        match result {
            Ok(emitted) if emitted > 0 => {
                debug!(pass = reply.pass.as_str(), time, emitted, "Emitted messages");
            }
            Ok(_) => {}
            Err(e) => warn!(pass = reply.pass.as_str(), time, "Subscriber failed: {}", e),
        }
    }

    /// Start a position round trip tagged with the current generation
    fn request_position(&mut self, pass: Pass) {
        let property = self.config.position_property.clone();
        let request = self.conn.get_property(&property);
        let replies = self.replies_tx.clone();
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            let result = request
                .await
                .and_then(|value| position_from_value(&property, &value));
            let _ = replies.send(PositionReply {
                generation,
                pass,
                result,
            });
        });

        let previous = match pass {
            Pass::Advance => self.advance_request.replace(handle),
            Pass::Seek => {
                self.seek_in_flight = true;
                self.seek_request.replace(handle)
            }
        };
        // A stalled request is superseded, never retried.
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_requests(&mut self) {
        for handle in [self.advance_request.take(), self.seek_request.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }

    fn publish_lifecycle(&mut self, event: ChatEvent) {
        if let Err(e) = self.sync.publish(&event) {
            warn!(event = event.kind().as_str(), "Subscriber failed: {}", e);
        }
    }

    fn teardown(&mut self, mut notifications: mpsc::UnboundedReceiver<PlayerNotification>) {
        self.cancel_requests();
        notifications.close();
        drop(notifications);
        self.replies_rx.close();
        self.conn.disconnect();
        self.publish_lifecycle(ChatEvent::Closing);
        info!(
            emitted = self.sync.cursor(),
            messages = self.sync.store().len(),
            "Playback tracker stopped"
        );
    }
}
