//! Torrent entities and their owned files, peers, and trackers.

use std::fmt;

use chrono::{DateTime, Utc};
use remora_rpc::{FileInfo, FileStat, PeerInfo, TorrentInfo, TrackerStatInfo};
use serde::Serialize;

use crate::events::EntityKind;
use crate::live::LiveList;
use crate::reconcile::{ChangeSink, FieldChanges, Reconcile, reconcile_list};

/// Activity state derived from the daemon's numeric status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    /// Not transferring.
    #[default]
    Stopped,
    /// Queued for verification.
    CheckWait,
    /// Verifying local data.
    Checking,
    /// Queued for download.
    DownloadWait,
    /// Downloading.
    Downloading,
    /// Queued for seeding.
    SeedWait,
    /// Seeding.
    Seeding,
    /// A code this client does not know.
    Unknown(i64),
}

impl TorrentStatus {
    /// Map a daemon status code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Stopped,
            1 => Self::CheckWait,
            2 => Self::Checking,
            3 => Self::DownloadWait,
            4 => Self::Downloading,
            5 => Self::SeedWait,
            6 => Self::Seeding,
            other => Self::Unknown(other),
        }
    }

    /// Whether the torrent is moving data or about to.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Checking | Self::Downloading | Self::Seeding | Self::DownloadWait | Self::SeedWait
        )
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::CheckWait => f.write_str("queued to verify"),
            Self::Checking => f.write_str("verifying"),
            Self::DownloadWait => f.write_str("queued to download"),
            Self::Downloading => f.write_str("downloading"),
            Self::SeedWait => f.write_str("queued to seed"),
            Self::Seeding => f.write_str("seeding"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Unix seconds to a timestamp; the daemon reports 0 for "never".
fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    (seconds > 0)
        .then(|| DateTime::from_timestamp(seconds, 0))
        .flatten()
}

/// One torrent in the live model.
#[derive(Debug, Default)]
pub struct Torrent {
    /// Info hash; the durable identity.
    pub hash_string: String,
    /// Daemon-local id; may change across daemon restarts.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Activity state.
    pub status: TorrentStatus,
    /// Error code, 0 when healthy.
    pub error: i64,
    /// Error description.
    pub error_string: String,
    /// Size of all files.
    pub total_size: i64,
    /// Size of wanted files.
    pub size_when_done: i64,
    /// Bytes still needed.
    pub left_until_done: i64,
    /// Completion ratio of wanted files.
    pub percent_done: f64,
    /// Verification progress.
    pub recheck_progress: f64,
    /// Metadata progress for magnets.
    pub metadata_percent_complete: f64,
    /// Download rate, bytes per second.
    pub rate_download: i64,
    /// Upload rate, bytes per second.
    pub rate_upload: i64,
    /// Seconds until done; negative when unknown.
    pub eta: i64,
    /// Upload ratio.
    pub upload_ratio: f64,
    /// Bytes uploaded ever.
    pub uploaded_ever: i64,
    /// Bytes downloaded ever.
    pub downloaded_ever: i64,
    /// Verified bytes.
    pub have_valid: i64,
    /// Bytes discarded as corrupt.
    pub corrupt_ever: i64,
    /// Download directory.
    pub download_dir: String,
    /// When the torrent was added.
    pub added_date: Option<DateTime<Utc>>,
    /// When the torrent completed.
    pub done_date: Option<DateTime<Utc>>,
    /// Last activity.
    pub activity_date: Option<DateTime<Utc>>,
    /// Connected peers.
    pub peers_connected: i64,
    /// Peers we upload to.
    pub peers_getting_from_us: i64,
    /// Peers we download from.
    pub peers_sending_to_us: i64,
    /// Queue position.
    pub queue_position: i64,
    /// Reached its seeding limit.
    pub is_finished: bool,
    /// Stalled in the queue.
    pub is_stalled: bool,
    /// Private tracker flag.
    pub is_private: bool,
    /// Download limit in KB/s.
    pub download_limit: i64,
    /// Whether the download limit applies.
    pub download_limited: bool,
    /// Upload limit in KB/s.
    pub upload_limit: i64,
    /// Whether the upload limit applies.
    pub upload_limited: bool,
    /// Seed ratio limit.
    pub seed_ratio_limit: f64,
    /// Seed ratio mode.
    pub seed_ratio_mode: i64,
    /// Bandwidth priority.
    pub bandwidth_priority: i64,
    /// Whether session limits apply.
    pub honors_session_limits: bool,
    /// Peer limit.
    pub peer_limit: i64,
    /// Metainfo comment.
    pub comment: String,
    /// Metainfo creator.
    pub creator: String,
    /// Metainfo creation time.
    pub date_created: Option<DateTime<Utc>>,
    /// Piece count.
    pub piece_count: i64,
    /// Piece size.
    pub piece_size: i64,
    /// Magnet URI.
    pub magnet_link: String,
    /// User labels.
    pub labels: Vec<String>,
    /// Local-only pin. Never touched by reconciliation.
    pub pinned: bool,
    /// Files, keyed by index.
    pub files: LiveList<TorrentFile>,
    /// Connected peers, keyed by `address:port`.
    pub peers: LiveList<Peer>,
    /// Trackers, keyed by tracker id.
    pub trackers: LiveList<TrackerStat>,
}

impl Torrent {
    /// Fraction of wanted bytes present, from 0 to 1.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.percent_done.clamp(0.0, 1.0)
    }
}

impl Reconcile for Torrent {
    type Key = String;
    type Snapshot = TorrentInfo;
    const KIND: EntityKind = EntityKind::Torrent;

    fn snapshot_key(snapshot: &TorrentInfo, _index: usize) -> Option<String> {
        snapshot
            .hash_string
            .as_ref()
            .filter(|hash| !hash.is_empty())
            .cloned()
    }

    fn key(&self) -> &String {
        &self.hash_string
    }

    fn create(key: String) -> Self {
        Self {
            hash_string: key,
            ..Self::default()
        }
    }

    fn merge(&mut self, s: TorrentInfo, c: &mut FieldChanges, sink: &mut ChangeSink) {
        c.assign_some("id", &mut self.id, s.id);
        c.assign_some("name", &mut self.name, s.name);
        c.assign_some("status", &mut self.status, s.status.map(TorrentStatus::from_code));
        c.assign_some("error", &mut self.error, s.error);
        c.assign_some("error_string", &mut self.error_string, s.error_string);
        c.assign_some("total_size", &mut self.total_size, s.total_size);
        c.assign_some("size_when_done", &mut self.size_when_done, s.size_when_done);
        c.assign_some("left_until_done", &mut self.left_until_done, s.left_until_done);
        c.assign_some("percent_done", &mut self.percent_done, s.percent_done);
        c.assign_some("recheck_progress", &mut self.recheck_progress, s.recheck_progress);
        c.assign_some(
            "metadata_percent_complete",
            &mut self.metadata_percent_complete,
            s.metadata_percent_complete,
        );
        c.assign_some("rate_download", &mut self.rate_download, s.rate_download);
        c.assign_some("rate_upload", &mut self.rate_upload, s.rate_upload);
        c.assign_some("eta", &mut self.eta, s.eta);
        c.assign_some("upload_ratio", &mut self.upload_ratio, s.upload_ratio);
        c.assign_some("uploaded_ever", &mut self.uploaded_ever, s.uploaded_ever);
        c.assign_some("downloaded_ever", &mut self.downloaded_ever, s.downloaded_ever);
        c.assign_some("have_valid", &mut self.have_valid, s.have_valid);
        c.assign_some("corrupt_ever", &mut self.corrupt_ever, s.corrupt_ever);
        c.assign_some("download_dir", &mut self.download_dir, s.download_dir);
        c.assign_some("added_date", &mut self.added_date, s.added_date.map(timestamp));
        c.assign_some("done_date", &mut self.done_date, s.done_date.map(timestamp));
        c.assign_some("activity_date", &mut self.activity_date, s.activity_date.map(timestamp));
        c.assign_some("peers_connected", &mut self.peers_connected, s.peers_connected);
        c.assign_some(
            "peers_getting_from_us",
            &mut self.peers_getting_from_us,
            s.peers_getting_from_us,
        );
        c.assign_some("peers_sending_to_us", &mut self.peers_sending_to_us, s.peers_sending_to_us);
        c.assign_some("queue_position", &mut self.queue_position, s.queue_position);
        c.assign_some("is_finished", &mut self.is_finished, s.is_finished);
        c.assign_some("is_stalled", &mut self.is_stalled, s.is_stalled);
        c.assign_some("is_private", &mut self.is_private, s.is_private);
        c.assign_some("download_limit", &mut self.download_limit, s.download_limit);
        c.assign_some("download_limited", &mut self.download_limited, s.download_limited);
        c.assign_some("upload_limit", &mut self.upload_limit, s.upload_limit);
        c.assign_some("upload_limited", &mut self.upload_limited, s.upload_limited);
        c.assign_some("seed_ratio_limit", &mut self.seed_ratio_limit, s.seed_ratio_limit);
        c.assign_some("seed_ratio_mode", &mut self.seed_ratio_mode, s.seed_ratio_mode);
        c.assign_some("bandwidth_priority", &mut self.bandwidth_priority, s.bandwidth_priority);
        c.assign_some(
            "honors_session_limits",
            &mut self.honors_session_limits,
            s.honors_session_limits,
        );
        c.assign_some("peer_limit", &mut self.peer_limit, s.peer_limit);
        c.assign_some("comment", &mut self.comment, s.comment);
        c.assign_some("creator", &mut self.creator, s.creator);
        c.assign_some("date_created", &mut self.date_created, s.date_created.map(timestamp));
        c.assign_some("piece_count", &mut self.piece_count, s.piece_count);
        c.assign_some("piece_size", &mut self.piece_size, s.piece_size);
        c.assign_some("magnet_link", &mut self.magnet_link, s.magnet_link);
        c.assign_some("labels", &mut self.labels, s.labels);

        let parent = Some(self.hash_string.as_str());
        if s.files.is_some() || s.file_stats.is_some() {
            let files = FileSnapshot::zip(s.files, s.file_stats);
            reconcile_list(&mut self.files, files, parent, sink);
        }
        if let Some(peers) = s.peers {
            reconcile_list(&mut self.peers, peers, parent, sink);
        }
        if let Some(trackers) = s.tracker_stats {
            reconcile_list(&mut self.trackers, trackers, parent, sink);
        }
    }
}

/// One file of a torrent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TorrentFile {
    /// Position in the torrent's file list; the identity within the torrent.
    pub index: usize,
    /// Path relative to the download directory.
    pub name: String,
    /// Size in bytes.
    pub length: i64,
    /// Bytes present.
    pub bytes_completed: i64,
    /// Whether the file is selected for download.
    pub wanted: bool,
    /// Priority (-1 low, 0 normal, 1 high).
    pub priority: i64,
}

impl TorrentFile {
    /// Completion ratio from 0 to 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.length <= 0 {
            return 0.0;
        }
        (self.bytes_completed as f64 / self.length as f64).clamp(0.0, 1.0)
    }
}

/// `files` and `fileStats` entries sharing one index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileSnapshot {
    /// Name and size, when `files` was requested.
    pub info: Option<FileInfo>,
    /// Progress and selection, when `fileStats` was requested.
    pub stat: Option<FileStat>,
}

impl FileSnapshot {
    /// Pair the two per-index lists; either may be absent or shorter.
    #[must_use]
    pub fn zip(files: Option<Vec<FileInfo>>, stats: Option<Vec<FileStat>>) -> Vec<Self> {
        let files = files.unwrap_or_default();
        let stats = stats.unwrap_or_default();
        let len = files.len().max(stats.len());
        let mut files = files.into_iter();
        let mut stats = stats.into_iter();
        (0..len)
            .map(|_| Self {
                info: files.next(),
                stat: stats.next(),
            })
            .collect()
    }
}

impl Reconcile for TorrentFile {
    type Key = usize;
    type Snapshot = FileSnapshot;
    const KIND: EntityKind = EntityKind::File;

    fn snapshot_key(_snapshot: &FileSnapshot, index: usize) -> Option<usize> {
        Some(index)
    }

    fn key(&self) -> &usize {
        &self.index
    }

    fn create(index: usize) -> Self {
        Self {
            index,
            wanted: true,
            ..Self::default()
        }
    }

    fn merge(&mut self, s: FileSnapshot, c: &mut FieldChanges, _sink: &mut ChangeSink) {
        let mut completed = None;
        if let Some(info) = s.info {
            c.assign_some("name", &mut self.name, info.name);
            c.assign_some("length", &mut self.length, info.length);
            completed = info.bytes_completed;
        }
        if let Some(stat) = s.stat {
            c.assign_some("wanted", &mut self.wanted, stat.wanted);
            c.assign_some("priority", &mut self.priority, stat.priority);
            completed = stat.bytes_completed.or(completed);
        }
        c.assign_some("bytes_completed", &mut self.bytes_completed, completed);
    }
}

/// One connected peer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peer {
    /// `address:port`; the identity within the torrent.
    pub key: String,
    /// Remote address.
    pub address: String,
    /// Remote port.
    pub port: u16,
    /// Client software.
    pub client_name: String,
    /// Peer flag summary.
    pub flag_str: String,
    /// Download progress of the peer.
    pub progress: f64,
    /// Bytes per second from the peer.
    pub rate_to_client: i64,
    /// Bytes per second to the peer.
    pub rate_to_peer: i64,
    /// Connection is encrypted.
    pub is_encrypted: bool,
    /// Peer connected to us.
    pub is_incoming: bool,
    /// Connection uses uTP.
    pub is_utp: bool,
    /// We are downloading from the peer.
    pub is_downloading_from: bool,
    /// We are uploading to the peer.
    pub is_uploading_to: bool,
    /// We choke the peer.
    pub client_is_choked: bool,
    /// We are interested in the peer.
    pub client_is_interested: bool,
    /// The peer chokes us.
    pub peer_is_choked: bool,
    /// The peer is interested in us.
    pub peer_is_interested: bool,
}

impl Reconcile for Peer {
    type Key = String;
    type Snapshot = PeerInfo;
    const KIND: EntityKind = EntityKind::Peer;

    fn snapshot_key(snapshot: &PeerInfo, _index: usize) -> Option<String> {
        let address = snapshot.address.as_deref()?;
        let port = snapshot.port?;
        Some(format!("{address}:{port}"))
    }

    fn key(&self) -> &String {
        &self.key
    }

    fn create(key: String) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    fn merge(&mut self, s: PeerInfo, c: &mut FieldChanges, _sink: &mut ChangeSink) {
        c.assign_some("address", &mut self.address, s.address);
        c.assign_some("port", &mut self.port, s.port);
        c.assign_some("client_name", &mut self.client_name, s.client_name);
        c.assign_some("flag_str", &mut self.flag_str, s.flag_str);
        c.assign_some("progress", &mut self.progress, s.progress);
        c.assign_some("rate_to_client", &mut self.rate_to_client, s.rate_to_client);
        c.assign_some("rate_to_peer", &mut self.rate_to_peer, s.rate_to_peer);
        c.assign_some("is_encrypted", &mut self.is_encrypted, s.is_encrypted);
        c.assign_some("is_incoming", &mut self.is_incoming, s.is_incoming);
        c.assign_some("is_utp", &mut self.is_utp, s.is_utp);
        c.assign_some("is_downloading_from", &mut self.is_downloading_from, s.is_downloading_from);
        c.assign_some("is_uploading_to", &mut self.is_uploading_to, s.is_uploading_to);
        c.assign_some("client_is_choked", &mut self.client_is_choked, s.client_is_choked);
        c.assign_some(
            "client_is_interested",
            &mut self.client_is_interested,
            s.client_is_interested,
        );
        c.assign_some("peer_is_choked", &mut self.peer_is_choked, s.peer_is_choked);
        c.assign_some("peer_is_interested", &mut self.peer_is_interested, s.peer_is_interested);
    }
}

/// Announce and scrape state of one tracker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerStat {
    /// Daemon-assigned tracker id; the identity within the torrent.
    pub id: i64,
    /// Announce URL.
    pub announce: String,
    /// Tracker host.
    pub host: String,
    /// Scrape URL.
    pub scrape: String,
    /// Tier.
    pub tier: i64,
    /// Seeders reported by the last scrape.
    pub seeder_count: i64,
    /// Leechers reported by the last scrape.
    pub leecher_count: i64,
    /// Completed downloads reported by the last scrape.
    pub download_count: i64,
    /// Result text of the last announce.
    pub last_announce_result: String,
    /// Whether the last announce succeeded.
    pub last_announce_succeeded: bool,
    /// When the last announce happened.
    pub last_announce_time: Option<DateTime<Utc>>,
    /// When the next announce is due.
    pub next_announce_time: Option<DateTime<Utc>>,
    /// Backup tracker flag.
    pub is_backup: bool,
}

impl Reconcile for TrackerStat {
    type Key = i64;
    type Snapshot = TrackerStatInfo;
    const KIND: EntityKind = EntityKind::Tracker;

    fn snapshot_key(snapshot: &TrackerStatInfo, _index: usize) -> Option<i64> {
        snapshot.id
    }

    fn key(&self) -> &i64 {
        &self.id
    }

    fn create(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn merge(&mut self, s: TrackerStatInfo, c: &mut FieldChanges, _sink: &mut ChangeSink) {
        c.assign_some("announce", &mut self.announce, s.announce);
        c.assign_some("host", &mut self.host, s.host);
        c.assign_some("scrape", &mut self.scrape, s.scrape);
        c.assign_some("tier", &mut self.tier, s.tier);
        c.assign_some("seeder_count", &mut self.seeder_count, s.seeder_count);
        c.assign_some("leecher_count", &mut self.leecher_count, s.leecher_count);
        c.assign_some("download_count", &mut self.download_count, s.download_count);
        c.assign_some(
            "last_announce_result",
            &mut self.last_announce_result,
            s.last_announce_result,
        );
        c.assign_some(
            "last_announce_succeeded",
            &mut self.last_announce_succeeded,
            s.last_announce_succeeded,
        );
        c.assign_some(
            "last_announce_time",
            &mut self.last_announce_time,
            s.last_announce_time.map(timestamp),
        );
        c.assign_some(
            "next_announce_time",
            &mut self.next_announce_time,
            s.next_announce_time.map(timestamp),
        );
        c.assign_some("is_backup", &mut self.is_backup, s.is_backup);
    }
}
