//! Static tables mapping logical names to literal wire keys.

use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};

/// Methods exposed by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// Read daemon configuration.
    SessionGet,
    /// Update daemon configuration.
    SessionSet,
    /// Read transfer counters.
    SessionStats,
    /// Read torrents.
    TorrentGet,
    /// Add a torrent from a URL, magnet link, or metainfo payload.
    TorrentAdd,
    /// Update per-torrent settings.
    TorrentSet,
    /// Remove torrents, optionally deleting local data.
    TorrentRemove,
    /// Queue torrents for start.
    TorrentStart,
    /// Start torrents immediately, bypassing the queue.
    TorrentStartNow,
    /// Stop torrents.
    TorrentStop,
    /// Re-verify local data.
    TorrentVerify,
    /// Ask trackers for more peers.
    TorrentReannounce,
    /// Query free space at a path on the daemon host.
    FreeSpace,
}

impl RpcMethod {
    /// Every method in the catalogue.
    pub const ALL: [Self; 13] = [
        Self::SessionGet,
        Self::SessionSet,
        Self::SessionStats,
        Self::TorrentGet,
        Self::TorrentAdd,
        Self::TorrentSet,
        Self::TorrentRemove,
        Self::TorrentStart,
        Self::TorrentStartNow,
        Self::TorrentStop,
        Self::TorrentVerify,
        Self::TorrentReannounce,
        Self::FreeSpace,
    ];

    /// Literal method name on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::SessionGet => "session-get",
            Self::SessionSet => "session-set",
            Self::SessionStats => "session-stats",
            Self::TorrentGet => "torrent-get",
            Self::TorrentAdd => "torrent-add",
            Self::TorrentSet => "torrent-set",
            Self::TorrentRemove => "torrent-remove",
            Self::TorrentStart => "torrent-start",
            Self::TorrentStartNow => "torrent-start-now",
            Self::TorrentStop => "torrent-stop",
            Self::TorrentVerify => "torrent-verify",
            Self::TorrentReannounce => "torrent-reannounce",
            Self::FreeSpace => "free-space",
        }
    }
}

impl Display for RpcMethod {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.wire_name())
    }
}

impl Serialize for RpcMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

/// Torrent fields that can be requested through `torrent-get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TorrentField {
    /// Daemon-local numeric id.
    Id,
    /// Info hash, the durable identity.
    HashString,
    /// Display name.
    Name,
    /// Status code (0..=6).
    Status,
    /// Error code.
    Error,
    /// Error description.
    ErrorString,
    /// Size of all files.
    TotalSize,
    /// Size of wanted files.
    SizeWhenDone,
    /// Bytes still needed.
    LeftUntilDone,
    /// Completion ratio of wanted files.
    PercentDone,
    /// Verification progress.
    RecheckProgress,
    /// Metadata download progress for magnets.
    MetadataPercentComplete,
    /// Download rate in bytes per second.
    RateDownload,
    /// Upload rate in bytes per second.
    RateUpload,
    /// Seconds until done, negative when unknown.
    Eta,
    /// Upload ratio.
    UploadRatio,
    /// Total bytes uploaded.
    UploadedEver,
    /// Total bytes downloaded.
    DownloadedEver,
    /// Verified bytes on disk.
    HaveValid,
    /// Bytes discarded as corrupt.
    CorruptEver,
    /// Download directory.
    DownloadDir,
    /// Unix time the torrent was added.
    AddedDate,
    /// Unix time the torrent completed.
    DoneDate,
    /// Unix time of last activity.
    ActivityDate,
    /// Connected peer count.
    PeersConnected,
    /// Peers we upload to.
    PeersGettingFromUs,
    /// Peers we download from.
    PeersSendingToUs,
    /// Position in the queue.
    QueuePosition,
    /// Reached its seeding limit.
    IsFinished,
    /// Stalled in the queue.
    IsStalled,
    /// Private tracker flag.
    IsPrivate,
    /// Per-torrent download limit in KB/s.
    DownloadLimit,
    /// Whether the download limit applies.
    DownloadLimited,
    /// Per-torrent upload limit in KB/s.
    UploadLimit,
    /// Whether the upload limit applies.
    UploadLimited,
    /// Per-torrent seed ratio limit.
    SeedRatioLimit,
    /// Seed ratio mode (global, single, unlimited).
    SeedRatioMode,
    /// Bandwidth priority (-1, 0, 1).
    BandwidthPriority,
    /// Whether session limits apply.
    HonorsSessionLimits,
    /// Maximum peers for this torrent.
    PeerLimit,
    /// Metainfo comment.
    Comment,
    /// Metainfo creator.
    Creator,
    /// Metainfo creation time.
    DateCreated,
    /// Number of pieces.
    PieceCount,
    /// Piece size in bytes.
    PieceSize,
    /// Magnet URI.
    MagnetLink,
    /// User labels.
    Labels,
    /// File list.
    Files,
    /// Per-file wanted/priority/progress.
    FileStats,
    /// Connected peers.
    Peers,
    /// Per-tracker statistics.
    TrackerStats,
}

impl TorrentField {
    /// Every torrent field.
    pub const ALL: [Self; 51] = [
        Self::Id,
        Self::HashString,
        Self::Name,
        Self::Status,
        Self::Error,
        Self::ErrorString,
        Self::TotalSize,
        Self::SizeWhenDone,
        Self::LeftUntilDone,
        Self::PercentDone,
        Self::RecheckProgress,
        Self::MetadataPercentComplete,
        Self::RateDownload,
        Self::RateUpload,
        Self::Eta,
        Self::UploadRatio,
        Self::UploadedEver,
        Self::DownloadedEver,
        Self::HaveValid,
        Self::CorruptEver,
        Self::DownloadDir,
        Self::AddedDate,
        Self::DoneDate,
        Self::ActivityDate,
        Self::PeersConnected,
        Self::PeersGettingFromUs,
        Self::PeersSendingToUs,
        Self::QueuePosition,
        Self::IsFinished,
        Self::IsStalled,
        Self::IsPrivate,
        Self::DownloadLimit,
        Self::DownloadLimited,
        Self::UploadLimit,
        Self::UploadLimited,
        Self::SeedRatioLimit,
        Self::SeedRatioMode,
        Self::BandwidthPriority,
        Self::HonorsSessionLimits,
        Self::PeerLimit,
        Self::Comment,
        Self::Creator,
        Self::DateCreated,
        Self::PieceCount,
        Self::PieceSize,
        Self::MagnetLink,
        Self::Labels,
        Self::Files,
        Self::FileStats,
        Self::Peers,
        Self::TrackerStats,
    ];

    /// Fields polled for the torrent list every cycle.
    pub const LIST: [Self; 32] = [
        Self::Id,
        Self::HashString,
        Self::Name,
        Self::Status,
        Self::Error,
        Self::ErrorString,
        Self::TotalSize,
        Self::SizeWhenDone,
        Self::LeftUntilDone,
        Self::PercentDone,
        Self::RecheckProgress,
        Self::MetadataPercentComplete,
        Self::RateDownload,
        Self::RateUpload,
        Self::Eta,
        Self::UploadRatio,
        Self::UploadedEver,
        Self::DownloadedEver,
        Self::DownloadDir,
        Self::AddedDate,
        Self::DoneDate,
        Self::ActivityDate,
        Self::PeersConnected,
        Self::PeersGettingFromUs,
        Self::PeersSendingToUs,
        Self::QueuePosition,
        Self::IsFinished,
        Self::IsStalled,
        Self::DownloadLimit,
        Self::UploadLimit,
        Self::BandwidthPriority,
        Self::Labels,
    ];

    /// Literal key on the wire.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::HashString => "hashString",
            Self::Name => "name",
            Self::Status => "status",
            Self::Error => "error",
            Self::ErrorString => "errorString",
            Self::TotalSize => "totalSize",
            Self::SizeWhenDone => "sizeWhenDone",
            Self::LeftUntilDone => "leftUntilDone",
            Self::PercentDone => "percentDone",
            Self::RecheckProgress => "recheckProgress",
            Self::MetadataPercentComplete => "metadataPercentComplete",
            Self::RateDownload => "rateDownload",
            Self::RateUpload => "rateUpload",
            Self::Eta => "eta",
            Self::UploadRatio => "uploadRatio",
            Self::UploadedEver => "uploadedEver",
            Self::DownloadedEver => "downloadedEver",
            Self::HaveValid => "haveValid",
            Self::CorruptEver => "corruptEver",
            Self::DownloadDir => "downloadDir",
            Self::AddedDate => "addedDate",
            Self::DoneDate => "doneDate",
            Self::ActivityDate => "activityDate",
            Self::PeersConnected => "peersConnected",
            Self::PeersGettingFromUs => "peersGettingFromUs",
            Self::PeersSendingToUs => "peersSendingToUs",
            Self::QueuePosition => "queuePosition",
            Self::IsFinished => "isFinished",
            Self::IsStalled => "isStalled",
            Self::IsPrivate => "isPrivate",
            Self::DownloadLimit => "downloadLimit",
            Self::DownloadLimited => "downloadLimited",
            Self::UploadLimit => "uploadLimit",
            Self::UploadLimited => "uploadLimited",
            Self::SeedRatioLimit => "seedRatioLimit",
            Self::SeedRatioMode => "seedRatioMode",
            Self::BandwidthPriority => "bandwidthPriority",
            Self::HonorsSessionLimits => "honorsSessionLimits",
            Self::PeerLimit => "peer-limit",
            Self::Comment => "comment",
            Self::Creator => "creator",
            Self::DateCreated => "dateCreated",
            Self::PieceCount => "pieceCount",
            Self::PieceSize => "pieceSize",
            Self::MagnetLink => "magnetLink",
            Self::Labels => "labels",
            Self::Files => "files",
            Self::FileStats => "fileStats",
            Self::Peers => "peers",
            Self::TrackerStats => "trackerStats",
        }
    }

    /// Wire keys for a field selection, in order.
    #[must_use]
    pub fn wire_keys(fields: &[Self]) -> Vec<&'static str> {
        fields.iter().map(|field| field.wire_key()).collect()
    }
}

/// Session fields reported by `session-get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    /// Daemon version string.
    Version,
    /// RPC protocol version.
    RpcVersion,
    /// Oldest RPC version the daemon still accepts.
    RpcVersionMinimum,
    /// Current session id.
    SessionId,
    /// Daemon configuration directory.
    ConfigDir,
    /// Default download directory.
    DownloadDir,
    /// Directory for incomplete downloads.
    IncompleteDir,
    /// Whether the incomplete directory is used.
    IncompleteDirEnabled,
    /// Global download limit in KB/s.
    SpeedLimitDown,
    /// Whether the global download limit applies.
    SpeedLimitDownEnabled,
    /// Global upload limit in KB/s.
    SpeedLimitUp,
    /// Whether the global upload limit applies.
    SpeedLimitUpEnabled,
    /// Alternate download limit in KB/s.
    AltSpeedDown,
    /// Alternate upload limit in KB/s.
    AltSpeedUp,
    /// Whether alternate limits are active.
    AltSpeedEnabled,
    /// Incoming peer port.
    PeerPort,
    /// Global peer limit.
    PeerLimitGlobal,
    /// Default per-torrent peer limit.
    PeerLimitPerTorrent,
    /// Peer exchange toggle.
    PexEnabled,
    /// DHT toggle.
    DhtEnabled,
    /// Local peer discovery toggle.
    LpdEnabled,
    /// Encryption preference.
    Encryption,
    /// Global seed ratio limit.
    SeedRatioLimit,
    /// Whether the global seed ratio limit applies.
    SeedRatioLimited,
    /// Idle seeding limit in minutes.
    IdleSeedingLimit,
    /// Whether the idle seeding limit applies.
    IdleSeedingLimitEnabled,
    /// Download queue toggle.
    DownloadQueueEnabled,
    /// Download queue size.
    DownloadQueueSize,
    /// Seed queue toggle.
    SeedQueueEnabled,
    /// Seed queue size.
    SeedQueueSize,
    /// Start torrents when added.
    StartAddedTorrents,
    /// Append `.part` to incomplete files.
    RenamePartialFiles,
    /// UPnP / NAT-PMP toggle.
    PortForwardingEnabled,
}

impl SessionField {
    /// Every session field.
    pub const ALL: [Self; 33] = [
        Self::Version,
        Self::RpcVersion,
        Self::RpcVersionMinimum,
        Self::SessionId,
        Self::ConfigDir,
        Self::DownloadDir,
        Self::IncompleteDir,
        Self::IncompleteDirEnabled,
        Self::SpeedLimitDown,
        Self::SpeedLimitDownEnabled,
        Self::SpeedLimitUp,
        Self::SpeedLimitUpEnabled,
        Self::AltSpeedDown,
        Self::AltSpeedUp,
        Self::AltSpeedEnabled,
        Self::PeerPort,
        Self::PeerLimitGlobal,
        Self::PeerLimitPerTorrent,
        Self::PexEnabled,
        Self::DhtEnabled,
        Self::LpdEnabled,
        Self::Encryption,
        Self::SeedRatioLimit,
        Self::SeedRatioLimited,
        Self::IdleSeedingLimit,
        Self::IdleSeedingLimitEnabled,
        Self::DownloadQueueEnabled,
        Self::DownloadQueueSize,
        Self::SeedQueueEnabled,
        Self::SeedQueueSize,
        Self::StartAddedTorrents,
        Self::RenamePartialFiles,
        Self::PortForwardingEnabled,
    ];

    /// Literal key on the wire.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::RpcVersion => "rpc-version",
            Self::RpcVersionMinimum => "rpc-version-minimum",
            Self::SessionId => "session-id",
            Self::ConfigDir => "config-dir",
            Self::DownloadDir => "download-dir",
            Self::IncompleteDir => "incomplete-dir",
            Self::IncompleteDirEnabled => "incomplete-dir-enabled",
            Self::SpeedLimitDown => "speed-limit-down",
            Self::SpeedLimitDownEnabled => "speed-limit-down-enabled",
            Self::SpeedLimitUp => "speed-limit-up",
            Self::SpeedLimitUpEnabled => "speed-limit-up-enabled",
            Self::AltSpeedDown => "alt-speed-down",
            Self::AltSpeedUp => "alt-speed-up",
            Self::AltSpeedEnabled => "alt-speed-enabled",
            Self::PeerPort => "peer-port",
            Self::PeerLimitGlobal => "peer-limit-global",
            Self::PeerLimitPerTorrent => "peer-limit-per-torrent",
            Self::PexEnabled => "pex-enabled",
            Self::DhtEnabled => "dht-enabled",
            Self::LpdEnabled => "lpd-enabled",
            Self::Encryption => "encryption",
            Self::SeedRatioLimit => "seedRatioLimit",
            Self::SeedRatioLimited => "seedRatioLimited",
            Self::IdleSeedingLimit => "idle-seeding-limit",
            Self::IdleSeedingLimitEnabled => "idle-seeding-limit-enabled",
            Self::DownloadQueueEnabled => "download-queue-enabled",
            Self::DownloadQueueSize => "download-queue-size",
            Self::SeedQueueEnabled => "seed-queue-enabled",
            Self::SeedQueueSize => "seed-queue-size",
            Self::StartAddedTorrents => "start-added-torrents",
            Self::RenamePartialFiles => "rename-partial-files",
            Self::PortForwardingEnabled => "port-forwarding-enabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn wire_keys_are_unique() {
        let torrent: HashSet<_> = TorrentField::ALL.iter().map(|f| f.wire_key()).collect();
        assert_eq!(torrent.len(), TorrentField::ALL.len());
        let session: HashSet<_> = SessionField::ALL.iter().map(|f| f.wire_key()).collect();
        assert_eq!(session.len(), SessionField::ALL.len());
        let methods: HashSet<_> = RpcMethod::ALL.iter().map(|m| m.wire_name()).collect();
        assert_eq!(methods.len(), RpcMethod::ALL.len());
    }

    #[test]
    fn wire_keys_mix_conventions() {
        assert_eq!(TorrentField::HashString.wire_key(), "hashString");
        assert_eq!(TorrentField::PeerLimit.wire_key(), "peer-limit");
        assert_eq!(SessionField::SeedRatioLimit.wire_key(), "seedRatioLimit");
        assert_eq!(SessionField::DownloadDir.wire_key(), "download-dir");
    }

    #[test]
    fn list_selection_is_subset_of_all() {
        let all: HashSet<_> = TorrentField::ALL.iter().collect();
        assert!(TorrentField::LIST.iter().all(|field| all.contains(field)));
        assert!(TorrentField::LIST.contains(&TorrentField::HashString));
    }

    #[test]
    fn method_serializes_as_wire_name() {
        let value = serde_json::to_value(RpcMethod::TorrentStartNow).unwrap();
        assert_eq!(value, serde_json::json!("torrent-start-now"));
        assert_eq!(RpcMethod::FreeSpace.to_string(), "free-space");
    }
}
