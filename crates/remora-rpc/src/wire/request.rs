//! Request envelope and typed argument builders.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;
use serde_json::{Map, Value};

use super::fields::RpcMethod;
use crate::error::{ClientError, ClientResult};
use crate::tags::Tag;

/// Request envelope: `{"method", "arguments", "tag"}`. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    method: RpcMethod,
    arguments: Map<String, Value>,
    tag: Tag,
}

impl Request {
    /// Build a request for `method` stamped with `tag`.
    #[must_use]
    pub fn new(method: RpcMethod, tag: Tag, arguments: Map<String, Value>) -> Self {
        Self {
            method,
            arguments,
            tag,
        }
    }

    /// Correlation tag.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Serialise the envelope to bytes.
    ///
    /// # Errors
    ///
    /// Returns a client error if the arguments cannot be encoded.
    pub fn to_bytes(&self) -> ClientResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Treatment of `None` fields when turning a typed argument struct into a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Drop null-valued fields.
    #[default]
    Omit,
    /// Send null-valued fields so the daemon clears them.
    Keep,
}

/// Serialise a typed argument struct into an argument map.
///
/// # Errors
///
/// Returns a client error if `value` does not serialise to a JSON object.
pub fn to_arguments<T: Serialize>(
    value: &T,
    policy: NullPolicy,
) -> ClientResult<Map<String, Value>> {
    let Value::Object(mut map) = serde_json::to_value(value)? else {
        return Err(ClientError::client("request arguments must be an object"));
    };
    if policy == NullPolicy::Omit {
        map.retain(|_, value| !value.is_null());
    }
    Ok(map)
}

/// Torrent selector sent as the `ids` argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TorrentIds {
    /// Every torrent; the `ids` key is omitted.
    #[default]
    All,
    /// Daemon-local numeric ids.
    Ids(Vec<i64>),
    /// Info hashes.
    Hashes(Vec<String>),
    /// Torrents changed since the last `recently-active` query.
    RecentlyActive,
}

impl TorrentIds {
    /// Single torrent by info hash.
    #[must_use]
    pub fn hash(hash: impl Into<String>) -> Self {
        Self::Hashes(vec![hash.into()])
    }

    /// Wire value for the `ids` key, `None` when every torrent is targeted.
    #[must_use]
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::All => None,
            Self::Ids(ids) => Some(Value::from(ids.clone())),
            Self::Hashes(hashes) => Some(Value::from(hashes.clone())),
            Self::RecentlyActive => Some(Value::from("recently-active")),
        }
    }

    /// Insert the `ids` key into an argument map when applicable.
    pub fn apply(&self, arguments: &mut Map<String, Value>) {
        if let Some(value) = self.to_value() {
            arguments.insert("ids".to_string(), value);
        }
    }
}

/// Arguments for `torrent-add`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddTorrent {
    /// URL or magnet link.
    #[serde(rename = "filename")]
    pub filename: Option<String>,
    /// Base64-encoded metainfo file.
    #[serde(rename = "metainfo")]
    pub metainfo: Option<String>,
    /// Target directory.
    #[serde(rename = "download-dir")]
    pub download_dir: Option<String>,
    /// Add without starting.
    #[serde(rename = "paused")]
    pub paused: Option<bool>,
    /// Maximum peers.
    #[serde(rename = "peer-limit")]
    pub peer_limit: Option<i64>,
    /// Bandwidth priority (-1, 0, 1).
    #[serde(rename = "bandwidthPriority")]
    pub bandwidth_priority: Option<i64>,
    /// File indices to download.
    #[serde(rename = "files-wanted")]
    pub files_wanted: Option<Vec<usize>>,
    /// File indices to skip.
    #[serde(rename = "files-unwanted")]
    pub files_unwanted: Option<Vec<usize>>,
    /// Labels to attach.
    #[serde(rename = "labels")]
    pub labels: Option<Vec<String>>,
}

impl AddTorrent {
    /// Build from a magnet link, URL, or local `.torrent` path.
    ///
    /// Links are passed through as `filename`; local files are read and sent
    /// as base64 `metainfo` without inspecting their content.
    ///
    /// # Errors
    ///
    /// Returns a client error when the source is empty or the file cannot be read.
    pub fn from_source(source: &str) -> ClientResult<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ClientError::client("torrent source must not be empty"));
        }

        if is_link(source) {
            return Ok(Self {
                filename: Some(source.to_string()),
                ..Self::default()
            });
        }

        let path = Path::new(source);
        let bytes = std::fs::read(path).map_err(|err| {
            ClientError::client_with(
                format!("failed to read torrent file '{}'", path.display()),
                err,
            )
        })?;
        Ok(Self {
            metainfo: Some(general_purpose::STANDARD.encode(bytes)),
            ..Self::default()
        })
    }
}

fn is_link(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    ["magnet:", "http://", "https://"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Arguments for `torrent-set` (the `ids` key is added by the client).
#[derive(Debug, Clone, Default, Serialize)]
pub struct TorrentSetArgs {
    /// Bandwidth priority (-1, 0, 1).
    #[serde(rename = "bandwidthPriority")]
    pub bandwidth_priority: Option<i64>,
    /// Download limit in KB/s.
    #[serde(rename = "downloadLimit")]
    pub download_limit: Option<i64>,
    /// Whether the download limit applies.
    #[serde(rename = "downloadLimited")]
    pub download_limited: Option<bool>,
    /// Upload limit in KB/s.
    #[serde(rename = "uploadLimit")]
    pub upload_limit: Option<i64>,
    /// Whether the upload limit applies.
    #[serde(rename = "uploadLimited")]
    pub upload_limited: Option<bool>,
    /// Seed ratio limit.
    #[serde(rename = "seedRatioLimit")]
    pub seed_ratio_limit: Option<f64>,
    /// Seed ratio mode.
    #[serde(rename = "seedRatioMode")]
    pub seed_ratio_mode: Option<i64>,
    /// Whether session limits apply.
    #[serde(rename = "honorsSessionLimits")]
    pub honors_session_limits: Option<bool>,
    /// Maximum peers.
    #[serde(rename = "peer-limit")]
    pub peer_limit: Option<i64>,
    /// Queue position.
    #[serde(rename = "queuePosition")]
    pub queue_position: Option<i64>,
    /// New data location.
    #[serde(rename = "location")]
    pub location: Option<String>,
    /// Replacement label set.
    #[serde(rename = "labels")]
    pub labels: Option<Vec<String>>,
    /// File indices to download.
    #[serde(rename = "files-wanted")]
    pub files_wanted: Option<Vec<usize>>,
    /// File indices to skip.
    #[serde(rename = "files-unwanted")]
    pub files_unwanted: Option<Vec<usize>>,
    /// File indices at high priority.
    #[serde(rename = "priority-high")]
    pub priority_high: Option<Vec<usize>>,
    /// File indices at normal priority.
    #[serde(rename = "priority-normal")]
    pub priority_normal: Option<Vec<usize>>,
    /// File indices at low priority.
    #[serde(rename = "priority-low")]
    pub priority_low: Option<Vec<usize>>,
}

/// Per-torrent speed limits where `None` removes the limit.
///
/// Sent with [`NullPolicy::Keep`] so a cleared limit reaches the daemon as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeedLimits {
    #[serde(rename = "downloadLimit")]
    download_limit: Option<i64>,
    #[serde(rename = "downloadLimited")]
    download_limited: bool,
    #[serde(rename = "uploadLimit")]
    upload_limit: Option<i64>,
    #[serde(rename = "uploadLimited")]
    upload_limited: bool,
}

impl SpeedLimits {
    /// Limits in KB/s; `None` means unlimited.
    #[must_use]
    pub const fn new(download_kbps: Option<i64>, upload_kbps: Option<i64>) -> Self {
        Self {
            download_limit: download_kbps,
            download_limited: download_kbps.is_some(),
            upload_limit: upload_kbps,
            upload_limited: upload_kbps.is_some(),
        }
    }
}

/// Arguments for `session-set`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSettings {
    /// Default download directory.
    #[serde(rename = "download-dir")]
    pub download_dir: Option<String>,
    /// Global download limit in KB/s.
    #[serde(rename = "speed-limit-down")]
    pub speed_limit_down: Option<i64>,
    /// Whether the global download limit applies.
    #[serde(rename = "speed-limit-down-enabled")]
    pub speed_limit_down_enabled: Option<bool>,
    /// Global upload limit in KB/s.
    #[serde(rename = "speed-limit-up")]
    pub speed_limit_up: Option<i64>,
    /// Whether the global upload limit applies.
    #[serde(rename = "speed-limit-up-enabled")]
    pub speed_limit_up_enabled: Option<bool>,
    /// Alternate download limit in KB/s.
    #[serde(rename = "alt-speed-down")]
    pub alt_speed_down: Option<i64>,
    /// Alternate upload limit in KB/s.
    #[serde(rename = "alt-speed-up")]
    pub alt_speed_up: Option<i64>,
    /// Toggle alternate limits.
    #[serde(rename = "alt-speed-enabled")]
    pub alt_speed_enabled: Option<bool>,
    /// Incoming peer port.
    #[serde(rename = "peer-port")]
    pub peer_port: Option<u16>,
    /// Global peer limit.
    #[serde(rename = "peer-limit-global")]
    pub peer_limit_global: Option<i64>,
    /// Default per-torrent peer limit.
    #[serde(rename = "peer-limit-per-torrent")]
    pub peer_limit_per_torrent: Option<i64>,
    /// Global seed ratio limit.
    #[serde(rename = "seedRatioLimit")]
    pub seed_ratio_limit: Option<f64>,
    /// Whether the global seed ratio limit applies.
    #[serde(rename = "seedRatioLimited")]
    pub seed_ratio_limited: Option<bool>,
    /// Start torrents when added.
    #[serde(rename = "start-added-torrents")]
    pub start_added_torrents: Option<bool>,
    /// Download queue size.
    #[serde(rename = "download-queue-size")]
    pub download_queue_size: Option<i64>,
    /// Download queue toggle.
    #[serde(rename = "download-queue-enabled")]
    pub download_queue_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_serializes_method_arguments_and_tag() {
        let mut arguments = Map::new();
        TorrentIds::Ids(vec![1, 2]).apply(&mut arguments);
        let request = Request::new(RpcMethod::TorrentStop, 7, arguments);
        let value: Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"method": "torrent-stop", "arguments": {"ids": [1, 2]}, "tag": 7})
        );
    }

    #[test]
    fn omit_policy_drops_nulls_and_keep_policy_sends_them() {
        let args = TorrentSetArgs {
            download_limit: Some(100),
            ..TorrentSetArgs::default()
        };
        let omitted = to_arguments(&args, NullPolicy::Omit).unwrap();
        assert_eq!(Value::Object(omitted), json!({"downloadLimit": 100}));

        let cleared = to_arguments(&SpeedLimits::new(None, Some(50)), NullPolicy::Keep).unwrap();
        assert_eq!(
            Value::Object(cleared),
            json!({
                "downloadLimit": null,
                "downloadLimited": false,
                "uploadLimit": 50,
                "uploadLimited": true
            })
        );
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = to_arguments(&5_u8, NullPolicy::Omit).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn ids_selector_wire_values() {
        assert_eq!(TorrentIds::All.to_value(), None);
        assert_eq!(
            TorrentIds::RecentlyActive.to_value(),
            Some(json!("recently-active"))
        );
        assert_eq!(TorrentIds::hash("abc").to_value(), Some(json!(["abc"])));
    }

    #[test]
    fn add_from_magnet_uses_filename() {
        let add = AddTorrent::from_source(" magnet:?xt=urn:btih:abc ").unwrap();
        assert_eq!(add.filename.as_deref(), Some("magnet:?xt=urn:btih:abc"));
        assert!(add.metainfo.is_none());
        let map = to_arguments(&add, NullPolicy::Omit).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn add_from_file_encodes_metainfo() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"d4:infod4:name3:fooee")?;
        let path = file.path().to_string_lossy().to_string();
        let add = AddTorrent::from_source(&path)?;
        assert_eq!(
            add.metainfo.as_deref(),
            Some(general_purpose::STANDARD.encode(b"d4:infod4:name3:fooee").as_str())
        );
        assert!(add.filename.is_none());
        Ok(())
    }

    #[test]
    fn add_from_missing_file_is_client_error() {
        let err = AddTorrent::from_source("/definitely/missing.torrent").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Client);
        assert!(AddTorrent::from_source("   ").is_err());
    }
}
