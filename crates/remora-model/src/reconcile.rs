//! In-place merge of decoded snapshots onto live instances.
//!
//! A live instance whose identity key reappears in a snapshot is updated field
//! by field and keeps its identity; only fields whose value actually changed
//! are reported. Membership is diffed through a key lookup built once per
//! pass, so a pass is linear in the size of the snapshot plus the live set.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::events::{EntityKind, EntityRef, ModelChange};
use crate::live::{Live, LiveList};

/// Names of the fields an update changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldChanges {
    fields: Vec<&'static str>,
}

impl FieldChanges {
    /// Store `value` in `slot` and record `name` if they differ.
    pub fn assign<T: PartialEq>(&mut self, name: &'static str, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            self.fields.push(name);
        }
    }

    /// Like [`FieldChanges::assign`]; an absent value leaves `slot` untouched.
    pub fn assign_some<T: PartialEq>(&mut self, name: &'static str, slot: &mut T, value: Option<T>) {
        if let Some(value) = value {
            self.assign(name, slot, value);
        }
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Changed field names in assignment order.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    fn into_fields(self) -> Vec<&'static str> {
        self.fields
    }
}

/// Collects the changes produced by one reconciliation pass.
#[derive(Debug, Default)]
pub struct ChangeSink {
    changes: Vec<ModelChange>,
    muted: bool,
}

impl ChangeSink {
    /// Sink that records changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that discards everything; used while populating a new instance.
    #[must_use]
    pub fn muted() -> Self {
        Self {
            changes: Vec::new(),
            muted: true,
        }
    }

    /// Record a change.
    pub fn push(&mut self, change: ModelChange) {
        if !self.muted {
            self.changes.push(change);
        }
    }

    /// Recorded changes in the order they happened.
    #[must_use]
    pub fn into_changes(self) -> Vec<ModelChange> {
        self.changes
    }

    /// Number of recorded changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no change was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Record an update of `entity` if `changes` is non-empty.
    pub fn updated(&mut self, entity: EntityRef, changes: FieldChanges) {
        if !changes.is_empty() {
            self.push(ModelChange::Updated {
                entity,
                fields: changes.into_fields(),
            });
        }
    }
}

/// A live entity that can absorb snapshots of its remote counterpart.
pub trait Reconcile: Sized {
    /// Identity key, stable across polls.
    type Key: Clone + Eq + Hash + Display;
    /// Decoded snapshot of one remote entity.
    type Snapshot;
    /// Entity kind reported in change events.
    const KIND: EntityKind;

    /// Identity key of a snapshot at `index` in its list; `None` skips it.
    fn snapshot_key(snapshot: &Self::Snapshot, index: usize) -> Option<Self::Key>;

    /// Identity key of this instance.
    fn key(&self) -> &Self::Key;

    /// Empty instance for `key`, populated by a following [`Reconcile::merge`].
    fn create(key: Self::Key) -> Self;

    /// Absorb `snapshot`, recording changed fields in `changes`. Nested
    /// collections report their own membership and updates to `sink`.
    fn merge(&mut self, snapshot: Self::Snapshot, changes: &mut FieldChanges, sink: &mut ChangeSink);
}

/// How entities missing from the snapshot are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    /// The snapshot is the complete set; absent entities are removed.
    Exact,
    /// The snapshot is a partial update; absent entities are kept.
    Upsert,
}

/// Reconcile `live` so its membership equals `snapshot`.
pub fn reconcile_list<T: Reconcile>(
    live: &mut LiveList<T>,
    snapshot: Vec<T::Snapshot>,
    parent: Option<&str>,
    sink: &mut ChangeSink,
) {
    merge_list(live, snapshot, parent, sink, Membership::Exact);
}

/// Merge `snapshot` into `live` without removing absent entities.
pub fn upsert_list<T: Reconcile>(
    live: &mut LiveList<T>,
    snapshot: Vec<T::Snapshot>,
    parent: Option<&str>,
    sink: &mut ChangeSink,
) {
    merge_list(live, snapshot, parent, sink, Membership::Upsert);
}

/// Build a new live instance from a snapshot.
pub(crate) fn instantiate<T: Reconcile>(key: T::Key, snapshot: T::Snapshot) -> T {
    let mut entity = T::create(key);
    entity.merge(snapshot, &mut FieldChanges::default(), &mut ChangeSink::muted());
    entity
}

pub(crate) fn entity_ref<K: Display>(kind: EntityKind, key: &K, parent: Option<&str>) -> EntityRef {
    EntityRef {
        kind,
        key: key.to_string(),
        parent: parent.map(str::to_string),
    }
}

fn merge_list<T: Reconcile>(
    live: &mut LiveList<T>,
    snapshot: Vec<T::Snapshot>,
    parent: Option<&str>,
    sink: &mut ChangeSink,
    membership: Membership,
) {
    let mut incoming: HashMap<T::Key, T::Snapshot> = HashMap::with_capacity(snapshot.len());
    let mut order = Vec::with_capacity(snapshot.len());
    for (index, item) in snapshot.into_iter().enumerate() {
        let Some(key) = T::snapshot_key(&item, index) else {
            continue;
        };
        // A repeated key keeps its first position and its last values.
        if incoming.insert(key.clone(), item).is_none() {
            order.push(key);
        }
    }

    live.retain(|item| {
        let key = item.read().key().clone();
        match incoming.remove(&key) {
            Some(update) => {
                let mut changes = FieldChanges::default();
                item.write().merge(update, &mut changes, sink);
                sink.updated(entity_ref(T::KIND, &key, parent), changes);
                true
            }
            None if membership == Membership::Upsert => true,
            None => {
                sink.push(ModelChange::Removed {
                    entity: entity_ref(T::KIND, &key, parent),
                });
                false
            }
        }
    });

    for key in order {
        let Some(item) = incoming.remove(&key) else {
            continue;
        };
        let entity = entity_ref(T::KIND, &key, parent);
        live.push(Live::new(instantiate::<T>(key, item)));
        sink.push(ModelChange::Added { entity });
    }
}
