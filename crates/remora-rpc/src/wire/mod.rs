//! Wire contract between the client and the daemon.
//!
//! The daemon's keys mix camelCase (`hashString`, `rateDownload`) with
//! hyphenated names (`peer-limit`, `download-dir`), so every key is spelled out
//! literally: in the field tables (`fields.rs`) and in explicit serde renames on
//! the DTOs. Response DTOs are lenient: unknown keys are ignored and absent keys
//! fall back to their default.

mod fields;
mod request;
mod response;

pub use fields::{RpcMethod, SessionField, TorrentField};
pub use request::{
    AddTorrent, NullPolicy, Request, SessionSettings, SpeedLimits, TorrentIds, TorrentSetArgs,
    to_arguments,
};
pub use response::{
    FileInfo, FileStat, FreeSpace, PeerInfo, Response, ResponseArguments, SessionInfo,
    SessionStats, Stats, TorrentAddResult, TorrentInfo, TorrentList, TrackerStatInfo,
};

/// Result string the daemon sends for successful calls.
pub const RESULT_SUCCESS: &str = "success";
