//! Change notifications raised by reconciliation.
//!
//! The bus assigns sequential identifiers and keeps a bounded replay buffer so
//! a presentation layer that subscribes late (or reconnects) can catch up on
//! recent changes. Internally it uses `tokio::broadcast`; when a subscriber
//! falls behind, the oldest changes are dropped for that subscriber.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// Identifier assigned to each published change.
pub type ChangeId = u64;

/// Default size of the replay ring and broadcast buffer.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Kind of live entity a change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A torrent, keyed by info hash.
    Torrent,
    /// A file of a torrent, keyed by index.
    File,
    /// A connected peer, keyed by `address:port`.
    Peer,
    /// A tracker of a torrent, keyed by tracker id.
    Tracker,
    /// The daemon session configuration.
    Session,
    /// The daemon transfer counters.
    SessionStats,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Torrent => "torrent",
            Self::File => "file",
            Self::Peer => "peer",
            Self::Tracker => "tracker",
            Self::Session => "session",
            Self::SessionStats => "session_stats",
        })
    }
}

/// Identifies one live entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    /// Entity kind.
    pub kind: EntityKind,
    /// Identity key rendered as text.
    pub key: String,
    /// Key of the owning torrent for files, peers, and trackers.
    pub parent: Option<String>,
}

/// Change to the live model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelChange {
    /// A new live instance was created.
    Added {
        /// Created entity.
        entity: EntityRef,
    },
    /// A live instance was dropped from the model.
    Removed {
        /// Removed entity.
        entity: EntityRef,
    },
    /// Fields of a live instance changed in place.
    Updated {
        /// Updated entity.
        entity: EntityRef,
        /// Names of exactly the fields whose value changed.
        fields: Vec<&'static str>,
    },
}

impl ModelChange {
    /// Entity the change refers to.
    #[must_use]
    pub const fn entity(&self) -> &EntityRef {
        match self {
            Self::Added { entity } | Self::Removed { entity } | Self::Updated { entity, .. } => {
                entity
            }
        }
    }
}

/// Change with its sequence id and emission time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEnvelope {
    /// Sequential id.
    pub id: ChangeId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// The change itself.
    pub change: ModelChange,
}

/// Broadcast bus for [`ModelChange`]s.
#[derive(Debug, Clone)]
pub struct ModelEvents {
    sender: Sender<ChangeEnvelope>,
    replay: Arc<Mutex<VecDeque<ChangeEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl ModelEvents {
    /// Bus whose broadcast buffer and replay ring hold `capacity` changes.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish `change`, returning its sequential id.
    pub fn publish(&self, change: ModelChange) -> ChangeId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = ChangeEnvelope {
            id,
            timestamp: Utc::now(),
            change,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to future changes, first replaying buffered changes newer than
    /// `since`.
    #[must_use]
    pub fn subscribe(&self, since: Option<ChangeId>) -> ChangeStream {
        let receiver = self.sender.subscribe();
        let backlog = since.map_or_else(VecDeque::new, |since| {
            self.lock_replay()
                .iter()
                .filter(|envelope| envelope.id > since)
                .cloned()
                .collect()
        });
        ChangeStream {
            backlog,
            live: BroadcastStream::new(receiver),
            last_seen: since,
        }
    }

    /// Id of the most recently published change.
    #[must_use]
    pub fn last_change_id(&self) -> Option<ChangeId> {
        self.lock_replay().back().map(|envelope| envelope.id)
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<ChangeEnvelope>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModelEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber end of [`ModelEvents`]: replayed changes first, then live ones.
pub struct ChangeStream {
    backlog: VecDeque<ChangeEnvelope>,
    live: BroadcastStream<ChangeEnvelope>,
    last_seen: Option<ChangeId>,
}

impl ChangeStream {
    /// Next change, or `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<ChangeEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            self.last_seen = Some(envelope.id);
            return Some(envelope);
        }
        while let Some(item) = self.live.next().await {
            match item {
                // Changes published between subscribing and draining the
                // backlog arrive twice.
                Ok(envelope) if self.last_seen.is_some_and(|seen| envelope.id <= seen) => {}
                Ok(envelope) => {
                    self.last_seen = Some(envelope.id);
                    return Some(envelope);
                }
                Err(err) => debug!(error = %err, "change subscriber lagged"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn added(key: &str) -> ModelChange {
        ModelChange::Added {
            entity: EntityRef {
                kind: EntityKind::Torrent,
                key: key.to_string(),
                parent: None,
            },
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let events = ModelEvents::with_capacity(16);
        let mut last = 0;
        for key in ["a", "b", "c", "d", "e"] {
            last = events.publish(added(key));
        }
        assert_eq!(last, 5);
        assert_eq!(events.last_change_id(), Some(5));

        let mut stream = events.subscribe(Some(2));
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(stream.next().await.expect("replayed change").id);
        }
        assert_eq!(ids, [3, 4, 5]);

        events.publish(added("f"));
        let next = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("live change arrives")
            .expect("bus open");
        assert_eq!(next.id, 6);
        assert_eq!(next.change.entity().key, "f");
    }

    #[tokio::test]
    async fn replay_ring_is_bounded() {
        let events = ModelEvents::with_capacity(2);
        for key in ["a", "b", "c"] {
            events.publish(added(key));
        }
        let mut stream = events.subscribe(Some(0));
        assert_eq!(stream.next().await.map(|envelope| envelope.id), Some(2));
        assert_eq!(stream.next().await.map(|envelope| envelope.id), Some(3));
    }

    #[tokio::test]
    async fn stream_ends_when_bus_dropped() {
        let events = ModelEvents::new();
        let mut stream = events.subscribe(None);
        drop(events);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn updated_change_serialises_field_names() {
        let change = ModelChange::Updated {
            entity: EntityRef {
                kind: EntityKind::Peer,
                key: "10.0.0.2:51413".into(),
                parent: Some("aa".into()),
            },
            fields: vec!["rate_to_client"],
        };
        let json = serde_json::to_value(&change).expect("serialise");
        assert_eq!(json["type"], "updated");
        assert_eq!(json["entity"]["kind"], "peer");
        assert_eq!(json["fields"][0], "rate_to_client");
    }
}
