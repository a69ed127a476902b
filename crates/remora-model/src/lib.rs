#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Live, identity-stable model of daemon state.
//!
//! Layout:
//! - `live.rs`: shared handles and ordered live collections
//! - `events.rs`: change notifications and the broadcast bus
//! - `reconcile.rs`: the in-place merge algorithm
//! - `torrent.rs`, `session.rs`: model entities
//! - `store.rs`: the store that owns the graph and applies snapshots

pub mod events;
pub mod live;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod torrent;

pub use events::{
    ChangeEnvelope, ChangeId, ChangeStream, EntityKind, EntityRef, ModelChange, ModelEvents,
};
pub use live::{Live, LiveList};
pub use reconcile::{ChangeSink, FieldChanges, Reconcile, reconcile_list, upsert_list};
pub use session::{SessionState, SessionStatistics};
pub use store::{ModelStore, ReconcileReport};
pub use torrent::{FileSnapshot, Peer, Torrent, TorrentFile, TorrentStatus, TrackerStat};
