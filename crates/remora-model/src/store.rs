//! Owner of the live model graph.
//!
//! All mutation goes through `&mut self`, so passes are serialised by whoever
//! owns the store. Each pass publishes its changes on the [`ModelEvents`] bus
//! after the pass completes.

use std::collections::HashSet;
use std::ops::AddAssign;

use remora_rpc::{SessionInfo, SessionStats, TorrentInfo, TorrentList};
use tracing::debug;

use crate::events::{EntityKind, ModelChange, ModelEvents};
use crate::live::{Live, LiveList};
use crate::reconcile::{ChangeSink, FieldChanges, entity_ref, reconcile_list, upsert_list};
use crate::session::{SessionState, SessionStatistics};
use crate::torrent::Torrent;

const SESSION_KEY: &str = "session";

/// Counts of the changes one pass produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Instances created.
    pub added: usize,
    /// Instances dropped.
    pub removed: usize,
    /// Instances updated in place.
    pub updated: usize,
}

impl ReconcileReport {
    fn from_changes(changes: &[ModelChange]) -> Self {
        changes
            .iter()
            .fold(Self::default(), |mut report, change| {
                match change {
                    ModelChange::Added { .. } => report.added += 1,
                    ModelChange::Removed { .. } => report.removed += 1,
                    ModelChange::Updated { .. } => report.updated += 1,
                }
                report
            })
    }

    /// Whether the pass changed nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

impl AddAssign for ReconcileReport {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.updated += other.updated;
    }
}

/// Live torrents and session state kept in sync with the daemon.
#[derive(Debug)]
pub struct ModelStore {
    torrents: LiveList<Torrent>,
    session: Live<SessionState>,
    stats: Live<SessionStatistics>,
    events: ModelEvents,
}

impl ModelStore {
    /// Empty store publishing on `events`.
    #[must_use]
    pub fn new(events: ModelEvents) -> Self {
        Self {
            torrents: LiveList::new(),
            session: Live::new(SessionState::default()),
            stats: Live::new(SessionStatistics::default()),
            events,
        }
    }

    /// Live torrents in display order.
    #[must_use]
    pub const fn torrents(&self) -> &LiveList<Torrent> {
        &self.torrents
    }

    /// Live torrent with info hash `hash`.
    #[must_use]
    pub fn torrent(&self, hash: &str) -> Option<Live<Torrent>> {
        self.torrents
            .iter()
            .find(|torrent| torrent.read().hash_string == hash)
            .cloned()
    }

    /// Live session configuration.
    #[must_use]
    pub fn session(&self) -> Live<SessionState> {
        self.session.clone()
    }

    /// Live transfer counters.
    #[must_use]
    pub fn stats(&self) -> Live<SessionStatistics> {
        self.stats.clone()
    }

    /// Bus the store publishes on.
    #[must_use]
    pub const fn events(&self) -> &ModelEvents {
        &self.events
    }

    /// Reconcile against a complete torrent list.
    pub fn apply_torrents(&mut self, torrents: Vec<TorrentInfo>) -> ReconcileReport {
        let mut sink = ChangeSink::new();
        reconcile_list(&mut self.torrents, torrents, None, &mut sink);
        self.publish(sink, "torrents")
    }

    /// Merge a `recently-active` delta: upsert the changed torrents and drop
    /// the ones whose ids are listed as removed.
    pub fn apply_torrent_delta(&mut self, delta: TorrentList) -> ReconcileReport {
        let mut sink = ChangeSink::new();
        upsert_list(&mut self.torrents, delta.torrents, None, &mut sink);
        if let Some(removed) = delta.removed.filter(|ids| !ids.is_empty()) {
            let removed: HashSet<i64> = removed.into_iter().collect();
            self.torrents.retain(|torrent| {
                let torrent = torrent.read();
                if removed.contains(&torrent.id) {
                    sink.push(ModelChange::Removed {
                        entity: entity_ref(EntityKind::Torrent, &torrent.hash_string, None),
                    });
                    false
                } else {
                    true
                }
            });
        }
        self.publish(sink, "torrent delta")
    }

    /// Absorb a `session-get` snapshot.
    pub fn apply_session(&mut self, info: SessionInfo) -> ReconcileReport {
        let mut changes = FieldChanges::default();
        self.session.write().absorb(info, &mut changes);
        let mut sink = ChangeSink::new();
        sink.updated(entity_ref(EntityKind::Session, &SESSION_KEY, None), changes);
        self.publish(sink, "session")
    }

    /// Absorb a `session-stats` snapshot.
    pub fn apply_session_stats(&mut self, stats: SessionStats) -> ReconcileReport {
        let mut changes = FieldChanges::default();
        self.stats.write().absorb(stats, &mut changes);
        let mut sink = ChangeSink::new();
        sink.updated(entity_ref(EntityKind::SessionStats, &SESSION_KEY, None), changes);
        self.publish(sink, "session stats")
    }

    /// Set the local pin on a torrent. Returns `false` if no such torrent.
    pub fn set_pinned(&mut self, hash: &str, pinned: bool) -> bool {
        let Some(torrent) = self.torrent(hash) else {
            return false;
        };
        let mut changes = FieldChanges::default();
        changes.assign("pinned", &mut torrent.write().pinned, pinned);
        let mut sink = ChangeSink::new();
        sink.updated(entity_ref(EntityKind::Torrent, &hash, None), changes);
        self.publish(sink, "pin");
        true
    }

    fn publish(&self, sink: ChangeSink, pass: &'static str) -> ReconcileReport {
        let changes = sink.into_changes();
        let report = ReconcileReport::from_changes(&changes);
        if !report.is_empty() {
            debug!(
                pass,
                added = report.added,
                removed = report.removed,
                updated = report.updated,
                "reconciled model"
            );
        }
        for change in changes {
            self.events.publish(change);
        }
        report
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(ModelEvents::new())
    }
}

#[cfg(test)]
mod tests {
    use remora_rpc::{ResponseArguments, RpcMethod, decode};
    use remora_test_support::fixtures;
    use serde_json::{Value, json};

    use super::*;

    fn infos(values: Vec<Value>) -> Vec<TorrentInfo> {
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).expect("fixture decodes"))
            .collect()
    }

    fn hashes(store: &ModelStore) -> Vec<String> {
        store
            .torrents()
            .iter()
            .map(|torrent| torrent.read().hash_string.clone())
            .collect()
    }

    #[test]
    fn poll_replaces_membership_and_keeps_identity() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![
            fixtures::torrent(1, "a", "A"),
            fixtures::torrent(2, "b", "B"),
            fixtures::torrent(3, "c", "C"),
        ]));
        let b = store.torrent("b").expect("b");
        let c = store.torrent("c").expect("c");

        let mut b_next = fixtures::torrent(2, "b", "B renamed");
        b_next["rateDownload"] = json!(9_000);
        let report = store.apply_torrents(infos(vec![
            b_next,
            fixtures::torrent(3, "c", "C"),
            fixtures::torrent(4, "d", "D"),
        ]));

        assert_eq!(hashes(&store), ["b", "c", "d"]);
        assert!(store.torrent("b").expect("b").ptr_eq(&b));
        assert!(store.torrent("c").expect("c").ptr_eq(&c));
        assert!(store.torrent("a").is_none());
        assert_eq!(b.read().name, "B renamed");
        assert_eq!(b.read().rate_download, 9_000);
        assert_eq!(
            report,
            ReconcileReport {
                added: 1,
                removed: 1,
                updated: 1
            }
        );
    }

    #[test]
    fn reapplying_a_snapshot_publishes_nothing() {
        let mut store = ModelStore::default();
        let snapshot = vec![
            fixtures::detailed_torrent(1, "a", "A"),
            fixtures::torrent(2, "b", "B"),
        ];
        store.apply_torrents(infos(snapshot.clone()));
        let before = store.events().last_change_id();

        let report = store.apply_torrents(infos(snapshot));
        assert!(report.is_empty());
        assert_eq!(store.events().last_change_id(), before);
    }

    #[test]
    fn reports_accumulate() {
        let mut total = ReconcileReport {
            added: 1,
            ..ReconcileReport::default()
        };
        total += ReconcileReport {
            added: 2,
            removed: 1,
            updated: 4,
        };
        assert_eq!(
            total,
            ReconcileReport {
                added: 3,
                removed: 1,
                updated: 4
            }
        );
    }

    #[test]
    fn daemon_renumbering_keeps_the_instance() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![fixtures::torrent(1, "a", "A")]));
        let a = store.torrent("a").expect("a");
        store.apply_torrents(infos(vec![fixtures::torrent(17, "a", "A")]));
        assert!(store.torrent("a").expect("a").ptr_eq(&a));
        assert_eq!(a.read().id, 17);
    }

    #[test]
    fn pin_survives_reconciliation() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![fixtures::torrent(1, "a", "A")]));
        assert!(store.set_pinned("a", true));
        assert!(!store.set_pinned("missing", true));

        let mut changed = fixtures::torrent(1, "a", "A");
        changed["name"] = json!("A2");
        changed["status"] = json!(0);
        store.apply_torrents(infos(vec![changed]));

        let a = store.torrent("a").expect("a");
        assert!(a.read().pinned);
        assert_eq!(a.read().name, "A2");
    }

    #[test]
    fn delta_upserts_and_drops_removed_ids() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![
            fixtures::torrent(1, "a", "A"),
            fixtures::torrent(2, "b", "B"),
            fixtures::torrent(3, "c", "C"),
        ]));
        let report = store.apply_torrent_delta(TorrentList {
            torrents: infos(vec![fixtures::torrent(4, "d", "D")]),
            removed: Some(vec![2]),
        });
        assert_eq!(hashes(&store), ["a", "c", "d"]);
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn large_delta_drops_every_listed_id() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(
            (0..2_000)
                .map(|id| fixtures::torrent(id, &format!("h{id}"), "T"))
                .collect(),
        ));
        let report = store.apply_torrent_delta(TorrentList {
            torrents: Vec::new(),
            removed: Some((0..2_000).filter(|id| id % 2 == 0).collect()),
        });
        assert_eq!(report.removed, 1_000);
        assert_eq!(store.torrents().len(), 1_000);
        assert!(store.torrent("h1").is_some());
        assert!(store.torrent("h2").is_none());
    }

    #[test]
    fn mistyped_field_keeps_the_torrent_instance() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![fixtures::torrent(1, "a", "A")]));
        let a = store.torrent("a").expect("a");

        let mut next = fixtures::torrent(1, "a", "A");
        next["eta"] = json!("unknown");
        next["rateDownload"] = json!(2_048);
        let raw = serde_json::to_vec(&fixtures::torrents(vec![next])).expect("encode");
        let Some(ResponseArguments::Torrents(list)) =
            decode(RpcMethod::TorrentGet, &raw).and_then(|response| response.arguments)
        else {
            panic!("expected torrents");
        };

        let report = store.apply_torrents(list.torrents);
        assert_eq!(report.removed, 0);
        assert_eq!(report.added, 0);
        assert!(store.torrent("a").expect("a").ptr_eq(&a));
        assert_eq!(a.read().rate_download, 2_048);
    }

    #[tokio::test]
    async fn subscribers_see_exactly_the_changed_fields() {
        let mut store = ModelStore::default();
        store.apply_torrents(infos(vec![fixtures::torrent(1, "a", "A")]));
        let mut stream = store.events().subscribe(store.events().last_change_id());

        let mut next = fixtures::torrent(1, "a", "A");
        next["rateUpload"] = json!(512);
        store.apply_torrents(infos(vec![next]));

        let envelope = stream.next().await.expect("update published");
        assert_eq!(
            envelope.change,
            ModelChange::Updated {
                entity: entity_ref(EntityKind::Torrent, &"a", None),
                fields: vec!["rate_upload"],
            }
        );
    }

    #[test]
    fn session_snapshots_update_in_place() {
        let mut store = ModelStore::default();
        let session = store.session();
        let info: SessionInfo =
            serde_json::from_value(fixtures::session()["arguments"].clone()).expect("session");
        let first = store.apply_session(info.clone());
        assert_eq!(first.updated, 1);
        assert_eq!(session.read().download_dir, "/srv/torrents");
        assert!(store.apply_session(info).is_empty());

        let stats: SessionStats =
            serde_json::from_value(fixtures::session_stats(10, 20)["arguments"].clone())
                .expect("stats");
        store.apply_session_stats(stats);
        assert_eq!(store.stats().read().upload_speed, 20);
        assert_eq!(store.stats().read().current.seconds_active, 50);
    }
}
