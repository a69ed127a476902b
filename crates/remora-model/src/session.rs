//! Singleton session configuration and transfer counters.

use remora_rpc::{SessionInfo, SessionStats, Stats};

use crate::reconcile::FieldChanges;

/// Daemon configuration as of the last `session-get`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    /// Daemon version string.
    pub version: String,
    /// Protocol version spoken by the daemon.
    pub rpc_version: i64,
    /// Oldest protocol version the daemon accepts.
    pub rpc_version_minimum: i64,
    /// Daemon-side session id.
    pub session_id: String,
    /// Daemon configuration directory.
    pub config_dir: String,
    /// Default download directory.
    pub download_dir: String,
    /// Directory for incomplete downloads.
    pub incomplete_dir: String,
    /// Whether the incomplete directory is used.
    pub incomplete_dir_enabled: bool,
    /// Global download limit in KB/s.
    pub speed_limit_down: i64,
    /// Whether the global download limit applies.
    pub speed_limit_down_enabled: bool,
    /// Global upload limit in KB/s.
    pub speed_limit_up: i64,
    /// Whether the global upload limit applies.
    pub speed_limit_up_enabled: bool,
    /// Alternate download limit in KB/s.
    pub alt_speed_down: i64,
    /// Alternate upload limit in KB/s.
    pub alt_speed_up: i64,
    /// Whether alternate limits are active.
    pub alt_speed_enabled: bool,
    /// Incoming peer port.
    pub peer_port: i64,
    /// Global peer limit.
    pub peer_limit_global: i64,
    /// Per-torrent peer limit.
    pub peer_limit_per_torrent: i64,
    /// Peer exchange enabled.
    pub pex_enabled: bool,
    /// DHT enabled.
    pub dht_enabled: bool,
    /// Local peer discovery enabled.
    pub lpd_enabled: bool,
    /// Encryption preference.
    pub encryption: String,
    /// Global seed ratio limit.
    pub seed_ratio_limit: f64,
    /// Whether the seed ratio limit applies.
    pub seed_ratio_limited: bool,
    /// Idle seeding limit in minutes.
    pub idle_seeding_limit: i64,
    /// Whether the idle seeding limit applies.
    pub idle_seeding_limit_enabled: bool,
    /// Whether the download queue is enabled.
    pub download_queue_enabled: bool,
    /// Download queue size.
    pub download_queue_size: i64,
    /// Whether the seed queue is enabled.
    pub seed_queue_enabled: bool,
    /// Seed queue size.
    pub seed_queue_size: i64,
    /// Start torrents when added.
    pub start_added_torrents: bool,
    /// Append `.part` to incomplete files.
    pub rename_partial_files: bool,
    /// Port forwarding enabled.
    pub port_forwarding_enabled: bool,
}

impl SessionState {
    /// Absorb a snapshot, recording changed fields.
    pub fn absorb(&mut self, s: SessionInfo, c: &mut FieldChanges) {
        c.assign_some("version", &mut self.version, s.version);
        c.assign_some("rpc_version", &mut self.rpc_version, s.rpc_version);
        c.assign_some("rpc_version_minimum", &mut self.rpc_version_minimum, s.rpc_version_minimum);
        c.assign_some("session_id", &mut self.session_id, s.session_id);
        c.assign_some("config_dir", &mut self.config_dir, s.config_dir);
        c.assign_some("download_dir", &mut self.download_dir, s.download_dir);
        c.assign_some("incomplete_dir", &mut self.incomplete_dir, s.incomplete_dir);
        c.assign_some(
            "incomplete_dir_enabled",
            &mut self.incomplete_dir_enabled,
            s.incomplete_dir_enabled,
        );
        c.assign_some("speed_limit_down", &mut self.speed_limit_down, s.speed_limit_down);
        c.assign_some(
            "speed_limit_down_enabled",
            &mut self.speed_limit_down_enabled,
            s.speed_limit_down_enabled,
        );
        c.assign_some("speed_limit_up", &mut self.speed_limit_up, s.speed_limit_up);
        c.assign_some(
            "speed_limit_up_enabled",
            &mut self.speed_limit_up_enabled,
            s.speed_limit_up_enabled,
        );
        c.assign_some("alt_speed_down", &mut self.alt_speed_down, s.alt_speed_down);
        c.assign_some("alt_speed_up", &mut self.alt_speed_up, s.alt_speed_up);
        c.assign_some("alt_speed_enabled", &mut self.alt_speed_enabled, s.alt_speed_enabled);
        c.assign_some("peer_port", &mut self.peer_port, s.peer_port);
        c.assign_some("peer_limit_global", &mut self.peer_limit_global, s.peer_limit_global);
        c.assign_some(
            "peer_limit_per_torrent",
            &mut self.peer_limit_per_torrent,
            s.peer_limit_per_torrent,
        );
        c.assign_some("pex_enabled", &mut self.pex_enabled, s.pex_enabled);
        c.assign_some("dht_enabled", &mut self.dht_enabled, s.dht_enabled);
        c.assign_some("lpd_enabled", &mut self.lpd_enabled, s.lpd_enabled);
        c.assign_some("encryption", &mut self.encryption, s.encryption);
        c.assign_some("seed_ratio_limit", &mut self.seed_ratio_limit, s.seed_ratio_limit);
        c.assign_some("seed_ratio_limited", &mut self.seed_ratio_limited, s.seed_ratio_limited);
        c.assign_some("idle_seeding_limit", &mut self.idle_seeding_limit, s.idle_seeding_limit);
        c.assign_some(
            "idle_seeding_limit_enabled",
            &mut self.idle_seeding_limit_enabled,
            s.idle_seeding_limit_enabled,
        );
        c.assign_some(
            "download_queue_enabled",
            &mut self.download_queue_enabled,
            s.download_queue_enabled,
        );
        c.assign_some("download_queue_size", &mut self.download_queue_size, s.download_queue_size);
        c.assign_some("seed_queue_enabled", &mut self.seed_queue_enabled, s.seed_queue_enabled);
        c.assign_some("seed_queue_size", &mut self.seed_queue_size, s.seed_queue_size);
        c.assign_some(
            "start_added_torrents",
            &mut self.start_added_torrents,
            s.start_added_torrents,
        );
        c.assign_some(
            "rename_partial_files",
            &mut self.rename_partial_files,
            s.rename_partial_files,
        );
        c.assign_some(
            "port_forwarding_enabled",
            &mut self.port_forwarding_enabled,
            s.port_forwarding_enabled,
        );
    }
}

/// Transfer counters as of the last `session-stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatistics {
    /// Torrents currently transferring.
    pub active_torrent_count: i64,
    /// Torrents stopped.
    pub paused_torrent_count: i64,
    /// All torrents.
    pub torrent_count: i64,
    /// Aggregate download rate, bytes per second.
    pub download_speed: i64,
    /// Aggregate upload rate, bytes per second.
    pub upload_speed: i64,
    /// Counters since the daemon was first run.
    pub cumulative: Stats,
    /// Counters for the current daemon run.
    pub current: Stats,
}

impl SessionStatistics {
    /// Absorb a snapshot, recording changed fields.
    pub fn absorb(&mut self, s: SessionStats, c: &mut FieldChanges) {
        c.assign_some("active_torrent_count", &mut self.active_torrent_count, s.active_torrent_count);
        c.assign_some("paused_torrent_count", &mut self.paused_torrent_count, s.paused_torrent_count);
        c.assign_some("torrent_count", &mut self.torrent_count, s.torrent_count);
        c.assign_some("download_speed", &mut self.download_speed, s.download_speed);
        c.assign_some("upload_speed", &mut self.upload_speed, s.upload_speed);
        c.assign_some("cumulative", &mut self.cumulative, s.cumulative_stats);
        c.assign_some("current", &mut self.current, s.current_stats);
    }
}
