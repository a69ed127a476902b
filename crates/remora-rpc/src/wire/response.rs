//! Response envelope and lenient argument DTOs.
//!
//! Every DTO uses `#[serde(default)]` and optional fields: a key the daemon did
//! not send (because it was not requested, or the daemon is older) decodes as
//! `None`, and unknown keys are ignored.

use serde::{Deserialize, Serialize};

use super::RESULT_SUCCESS;
use crate::tags::Tag;

/// Decoded response envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Result string, `"success"` when the call succeeded.
    pub result: String,
    /// Echoed request tag.
    pub tag: Option<Tag>,
    /// Decoded arguments; `None` when absent or undecodable.
    pub arguments: Option<ResponseArguments>,
}

impl Response {
    /// Whether the daemon reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == RESULT_SUCCESS
    }
}

/// Argument payload, shaped by the method that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseArguments {
    /// `session-get`.
    Session(SessionInfo),
    /// `session-stats`.
    SessionStats(SessionStats),
    /// `torrent-get`.
    Torrents(TorrentList),
    /// `torrent-add`.
    TorrentAdded(TorrentAddResult),
    /// `free-space`.
    FreeSpace(FreeSpace),
    /// Methods whose successful response carries no data.
    Empty,
}

/// `torrent-get` payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TorrentList {
    /// Torrents that decoded successfully.
    pub torrents: Vec<TorrentInfo>,
    /// Ids removed since the last `recently-active` query.
    pub removed: Option<Vec<i64>>,
}

/// One torrent as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentInfo {
    /// Daemon-local numeric id.
    #[serde(rename = "id")]
    pub id: Option<i64>,
    /// Info hash.
    #[serde(rename = "hashString")]
    pub hash_string: Option<String>,
    /// Display name.
    #[serde(rename = "name")]
    pub name: Option<String>,
    /// Status code.
    #[serde(rename = "status")]
    pub status: Option<i64>,
    /// Error code.
    #[serde(rename = "error")]
    pub error: Option<i64>,
    /// Error description.
    #[serde(rename = "errorString")]
    pub error_string: Option<String>,
    /// Size of all files.
    #[serde(rename = "totalSize")]
    pub total_size: Option<i64>,
    /// Size of wanted files.
    #[serde(rename = "sizeWhenDone")]
    pub size_when_done: Option<i64>,
    /// Bytes still needed.
    #[serde(rename = "leftUntilDone")]
    pub left_until_done: Option<i64>,
    /// Completion ratio.
    #[serde(rename = "percentDone")]
    pub percent_done: Option<f64>,
    /// Verification progress.
    #[serde(rename = "recheckProgress")]
    pub recheck_progress: Option<f64>,
    /// Metadata download progress.
    #[serde(rename = "metadataPercentComplete")]
    pub metadata_percent_complete: Option<f64>,
    /// Download rate in bytes per second.
    #[serde(rename = "rateDownload")]
    pub rate_download: Option<i64>,
    /// Upload rate in bytes per second.
    #[serde(rename = "rateUpload")]
    pub rate_upload: Option<i64>,
    /// Seconds until done.
    #[serde(rename = "eta")]
    pub eta: Option<i64>,
    /// Upload ratio.
    #[serde(rename = "uploadRatio")]
    pub upload_ratio: Option<f64>,
    /// Total bytes uploaded.
    #[serde(rename = "uploadedEver")]
    pub uploaded_ever: Option<i64>,
    /// Total bytes downloaded.
    #[serde(rename = "downloadedEver")]
    pub downloaded_ever: Option<i64>,
    /// Verified bytes.
    #[serde(rename = "haveValid")]
    pub have_valid: Option<i64>,
    /// Corrupt bytes discarded.
    #[serde(rename = "corruptEver")]
    pub corrupt_ever: Option<i64>,
    /// Download directory.
    #[serde(rename = "downloadDir")]
    pub download_dir: Option<String>,
    /// Unix time added.
    #[serde(rename = "addedDate")]
    pub added_date: Option<i64>,
    /// Unix time completed.
    #[serde(rename = "doneDate")]
    pub done_date: Option<i64>,
    /// Unix time of last activity.
    #[serde(rename = "activityDate")]
    pub activity_date: Option<i64>,
    /// Connected peers.
    #[serde(rename = "peersConnected")]
    pub peers_connected: Option<i64>,
    /// Peers we upload to.
    #[serde(rename = "peersGettingFromUs")]
    pub peers_getting_from_us: Option<i64>,
    /// Peers we download from.
    #[serde(rename = "peersSendingToUs")]
    pub peers_sending_to_us: Option<i64>,
    /// Queue position.
    #[serde(rename = "queuePosition")]
    pub queue_position: Option<i64>,
    /// Seeding limit reached.
    #[serde(rename = "isFinished")]
    pub is_finished: Option<bool>,
    /// Stalled in queue.
    #[serde(rename = "isStalled")]
    pub is_stalled: Option<bool>,
    /// Private torrent.
    #[serde(rename = "isPrivate")]
    pub is_private: Option<bool>,
    /// Download limit in KB/s.
    #[serde(rename = "downloadLimit")]
    pub download_limit: Option<i64>,
    /// Download limit applies.
    #[serde(rename = "downloadLimited")]
    pub download_limited: Option<bool>,
    /// Upload limit in KB/s.
    #[serde(rename = "uploadLimit")]
    pub upload_limit: Option<i64>,
    /// Upload limit applies.
    #[serde(rename = "uploadLimited")]
    pub upload_limited: Option<bool>,
    /// Seed ratio limit.
    #[serde(rename = "seedRatioLimit")]
    pub seed_ratio_limit: Option<f64>,
    /// Seed ratio mode.
    #[serde(rename = "seedRatioMode")]
    pub seed_ratio_mode: Option<i64>,
    /// Bandwidth priority.
    #[serde(rename = "bandwidthPriority")]
    pub bandwidth_priority: Option<i64>,
    /// Session limits apply.
    #[serde(rename = "honorsSessionLimits")]
    pub honors_session_limits: Option<bool>,
    /// Maximum peers.
    #[serde(rename = "peer-limit")]
    pub peer_limit: Option<i64>,
    /// Metainfo comment.
    #[serde(rename = "comment")]
    pub comment: Option<String>,
    /// Metainfo creator.
    #[serde(rename = "creator")]
    pub creator: Option<String>,
    /// Metainfo creation time.
    #[serde(rename = "dateCreated")]
    pub date_created: Option<i64>,
    /// Piece count.
    #[serde(rename = "pieceCount")]
    pub piece_count: Option<i64>,
    /// Piece size.
    #[serde(rename = "pieceSize")]
    pub piece_size: Option<i64>,
    /// Magnet URI.
    #[serde(rename = "magnetLink")]
    pub magnet_link: Option<String>,
    /// Labels.
    #[serde(rename = "labels")]
    pub labels: Option<Vec<String>>,
    /// Files.
    #[serde(rename = "files")]
    pub files: Option<Vec<FileInfo>>,
    /// Per-file stats, parallel to `files`.
    #[serde(rename = "fileStats")]
    pub file_stats: Option<Vec<FileStat>>,
    /// Connected peers.
    #[serde(rename = "peers")]
    pub peers: Option<Vec<PeerInfo>>,
    /// Tracker statistics.
    #[serde(rename = "trackerStats")]
    pub tracker_stats: Option<Vec<TrackerStatInfo>>,
}

/// File entry from `files`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    /// Path relative to the download directory.
    #[serde(rename = "name")]
    pub name: Option<String>,
    /// Size in bytes.
    #[serde(rename = "length")]
    pub length: Option<i64>,
    /// Bytes downloaded.
    #[serde(rename = "bytesCompleted")]
    pub bytes_completed: Option<i64>,
}

/// File entry from `fileStats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStat {
    /// Bytes downloaded.
    #[serde(rename = "bytesCompleted")]
    pub bytes_completed: Option<i64>,
    /// Selected for download.
    #[serde(rename = "wanted")]
    pub wanted: Option<bool>,
    /// Priority (-1, 0, 1).
    #[serde(rename = "priority")]
    pub priority: Option<i64>,
}

/// Peer entry from `peers`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerInfo {
    /// Remote address.
    #[serde(rename = "address")]
    pub address: Option<String>,
    /// Remote port.
    #[serde(rename = "port")]
    pub port: Option<u16>,
    /// Client software.
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    /// We are choking the peer.
    #[serde(rename = "clientIsChoked")]
    pub client_is_choked: Option<bool>,
    /// We are interested in the peer.
    #[serde(rename = "clientIsInterested")]
    pub client_is_interested: Option<bool>,
    /// Compact flag string.
    #[serde(rename = "flagStr")]
    pub flag_str: Option<String>,
    /// Downloading from this peer.
    #[serde(rename = "isDownloadingFrom")]
    pub is_downloading_from: Option<bool>,
    /// Encrypted connection.
    #[serde(rename = "isEncrypted")]
    pub is_encrypted: Option<bool>,
    /// Incoming connection.
    #[serde(rename = "isIncoming")]
    pub is_incoming: Option<bool>,
    /// Uploading to this peer.
    #[serde(rename = "isUploadingTo")]
    pub is_uploading_to: Option<bool>,
    /// Connected over uTP.
    #[serde(rename = "isUTP")]
    pub is_utp: Option<bool>,
    /// Peer is choking us.
    #[serde(rename = "peerIsChoked")]
    pub peer_is_choked: Option<bool>,
    /// Peer is interested in us.
    #[serde(rename = "peerIsInterested")]
    pub peer_is_interested: Option<bool>,
    /// Peer completion ratio.
    #[serde(rename = "progress")]
    pub progress: Option<f64>,
    /// Bytes per second from the peer.
    #[serde(rename = "rateToClient")]
    pub rate_to_client: Option<i64>,
    /// Bytes per second to the peer.
    #[serde(rename = "rateToPeer")]
    pub rate_to_peer: Option<i64>,
}

/// Tracker entry from `trackerStats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerStatInfo {
    /// Daemon-assigned tracker id.
    #[serde(rename = "id")]
    pub id: Option<i64>,
    /// Announce URL.
    #[serde(rename = "announce")]
    pub announce: Option<String>,
    /// Tracker host.
    #[serde(rename = "host")]
    pub host: Option<String>,
    /// Scrape URL.
    #[serde(rename = "scrape")]
    pub scrape: Option<String>,
    /// Tier.
    #[serde(rename = "tier")]
    pub tier: Option<i64>,
    /// Seeders reported by the last scrape.
    #[serde(rename = "seederCount")]
    pub seeder_count: Option<i64>,
    /// Leechers reported by the last scrape.
    #[serde(rename = "leecherCount")]
    pub leecher_count: Option<i64>,
    /// Completed downloads reported by the last scrape.
    #[serde(rename = "downloadCount")]
    pub download_count: Option<i64>,
    /// Last announce result text.
    #[serde(rename = "lastAnnounceResult")]
    pub last_announce_result: Option<String>,
    /// Last announce succeeded.
    #[serde(rename = "lastAnnounceSucceeded")]
    pub last_announce_succeeded: Option<bool>,
    /// Unix time of the last announce.
    #[serde(rename = "lastAnnounceTime")]
    pub last_announce_time: Option<i64>,
    /// Unix time of the next announce.
    #[serde(rename = "nextAnnounceTime")]
    pub next_announce_time: Option<i64>,
    /// Backup tracker.
    #[serde(rename = "isBackup")]
    pub is_backup: Option<bool>,
}

/// `session-get` payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    /// Daemon version string.
    #[serde(rename = "version")]
    pub version: Option<String>,
    /// RPC protocol version.
    #[serde(rename = "rpc-version")]
    pub rpc_version: Option<i64>,
    /// Oldest accepted RPC version.
    #[serde(rename = "rpc-version-minimum")]
    pub rpc_version_minimum: Option<i64>,
    /// Session id.
    #[serde(rename = "session-id")]
    pub session_id: Option<String>,
    /// Configuration directory.
    #[serde(rename = "config-dir")]
    pub config_dir: Option<String>,
    /// Default download directory.
    #[serde(rename = "download-dir")]
    pub download_dir: Option<String>,
    /// Incomplete directory.
    #[serde(rename = "incomplete-dir")]
    pub incomplete_dir: Option<String>,
    /// Incomplete directory enabled.
    #[serde(rename = "incomplete-dir-enabled")]
    pub incomplete_dir_enabled: Option<bool>,
    /// Global download limit in KB/s.
    #[serde(rename = "speed-limit-down")]
    pub speed_limit_down: Option<i64>,
    /// Global download limit enabled.
    #[serde(rename = "speed-limit-down-enabled")]
    pub speed_limit_down_enabled: Option<bool>,
    /// Global upload limit in KB/s.
    #[serde(rename = "speed-limit-up")]
    pub speed_limit_up: Option<i64>,
    /// Global upload limit enabled.
    #[serde(rename = "speed-limit-up-enabled")]
    pub speed_limit_up_enabled: Option<bool>,
    /// Alternate download limit.
    #[serde(rename = "alt-speed-down")]
    pub alt_speed_down: Option<i64>,
    /// Alternate upload limit.
    #[serde(rename = "alt-speed-up")]
    pub alt_speed_up: Option<i64>,
    /// Alternate limits active.
    #[serde(rename = "alt-speed-enabled")]
    pub alt_speed_enabled: Option<bool>,
    /// Incoming peer port.
    #[serde(rename = "peer-port")]
    pub peer_port: Option<i64>,
    /// Global peer limit.
    #[serde(rename = "peer-limit-global")]
    pub peer_limit_global: Option<i64>,
    /// Per-torrent peer limit.
    #[serde(rename = "peer-limit-per-torrent")]
    pub peer_limit_per_torrent: Option<i64>,
    /// Peer exchange.
    #[serde(rename = "pex-enabled")]
    pub pex_enabled: Option<bool>,
    /// DHT.
    #[serde(rename = "dht-enabled")]
    pub dht_enabled: Option<bool>,
    /// Local peer discovery.
    #[serde(rename = "lpd-enabled")]
    pub lpd_enabled: Option<bool>,
    /// Encryption preference.
    #[serde(rename = "encryption")]
    pub encryption: Option<String>,
    /// Global seed ratio limit.
    #[serde(rename = "seedRatioLimit")]
    pub seed_ratio_limit: Option<f64>,
    /// Global seed ratio limit enabled.
    #[serde(rename = "seedRatioLimited")]
    pub seed_ratio_limited: Option<bool>,
    /// Idle seeding limit in minutes.
    #[serde(rename = "idle-seeding-limit")]
    pub idle_seeding_limit: Option<i64>,
    /// Idle seeding limit enabled.
    #[serde(rename = "idle-seeding-limit-enabled")]
    pub idle_seeding_limit_enabled: Option<bool>,
    /// Download queue enabled.
    #[serde(rename = "download-queue-enabled")]
    pub download_queue_enabled: Option<bool>,
    /// Download queue size.
    #[serde(rename = "download-queue-size")]
    pub download_queue_size: Option<i64>,
    /// Seed queue enabled.
    #[serde(rename = "seed-queue-enabled")]
    pub seed_queue_enabled: Option<bool>,
    /// Seed queue size.
    #[serde(rename = "seed-queue-size")]
    pub seed_queue_size: Option<i64>,
    /// Start torrents when added.
    #[serde(rename = "start-added-torrents")]
    pub start_added_torrents: Option<bool>,
    /// Append `.part` to incomplete files.
    #[serde(rename = "rename-partial-files")]
    pub rename_partial_files: Option<bool>,
    /// Port forwarding.
    #[serde(rename = "port-forwarding-enabled")]
    pub port_forwarding_enabled: Option<bool>,
}

/// `session-stats` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    /// Torrents currently transferring.
    #[serde(rename = "activeTorrentCount")]
    pub active_torrent_count: Option<i64>,
    /// Torrents stopped.
    #[serde(rename = "pausedTorrentCount")]
    pub paused_torrent_count: Option<i64>,
    /// All torrents.
    #[serde(rename = "torrentCount")]
    pub torrent_count: Option<i64>,
    /// Aggregate download rate.
    #[serde(rename = "downloadSpeed")]
    pub download_speed: Option<i64>,
    /// Aggregate upload rate.
    #[serde(rename = "uploadSpeed")]
    pub upload_speed: Option<i64>,
    /// Counters since the daemon was first run.
    #[serde(rename = "cumulative-stats")]
    pub cumulative_stats: Option<Stats>,
    /// Counters for the current daemon run.
    #[serde(rename = "current-stats")]
    pub current_stats: Option<Stats>,
}

/// Transfer counters nested in [`SessionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Bytes uploaded.
    #[serde(rename = "uploadedBytes")]
    pub uploaded_bytes: i64,
    /// Bytes downloaded.
    #[serde(rename = "downloadedBytes")]
    pub downloaded_bytes: i64,
    /// Torrents added.
    #[serde(rename = "filesAdded")]
    pub files_added: i64,
    /// Daemon runs.
    #[serde(rename = "sessionCount")]
    pub session_count: i64,
    /// Seconds running.
    #[serde(rename = "secondsActive")]
    pub seconds_active: i64,
}

/// `torrent-add` payload; the same shape whether added or a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TorrentAddResult {
    /// Daemon-local id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Info hash.
    pub hash_string: String,
    /// The daemon already had this torrent.
    pub is_duplicate: bool,
}

/// `free-space` payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeSpace {
    /// Queried path.
    #[serde(rename = "path")]
    pub path: String,
    /// Free bytes; 0 when the daemon omitted it.
    #[serde(rename = "size-bytes")]
    pub size_bytes: i64,
    /// Total bytes on the volume, reported by newer daemons.
    #[serde(rename = "total_size")]
    pub total_size: Option<i64>,
}
