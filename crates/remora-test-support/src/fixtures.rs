//! JSON payload builders shaped like the daemon's responses.
//!
//! Responses are built without a `tag`; [`crate::FakeDaemon`] stamps the echoed
//! tag, and unit tests that bypass HTTP add it with [`with_tag`].

use serde_json::{Value, json};

/// `{"result": "success", "arguments": {}}`.
#[must_use]
pub fn success() -> Value {
    json!({"result": "success", "arguments": {}})
}

/// Failure envelope carrying `result` as the daemon's error string.
#[must_use]
pub fn failure(result: &str) -> Value {
    json!({"result": result, "arguments": {}})
}

/// Copy of `response` with `tag` set.
#[must_use]
pub fn with_tag(mut response: Value, tag: u64) -> Value {
    if let Some(map) = response.as_object_mut() {
        map.insert("tag".to_string(), Value::from(tag));
    }
    response
}

/// Minimal torrent entry with identity and a few stat fields.
#[must_use]
pub fn torrent(id: i64, hash: &str, name: &str) -> Value {
    json!({
        "id": id,
        "hashString": hash,
        "name": name,
        "status": 4,
        "percentDone": 0.5,
        "rateDownload": 1024,
        "rateUpload": 0,
        "totalSize": 4096,
        "addedDate": 1_700_000_000,
    })
}

/// Torrent entry carrying owned file, peer, and tracker lists.
#[must_use]
pub fn detailed_torrent(id: i64, hash: &str, name: &str) -> Value {
    let mut value = torrent(id, hash, name);
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "files".to_string(),
            json!([file("disc/a.bin", 2048, 1024), file("disc/b.bin", 2048, 0)]),
        );
        map.insert(
            "fileStats".to_string(),
            json!([
                {"bytesCompleted": 1024, "wanted": true, "priority": 0},
                {"bytesCompleted": 0, "wanted": false, "priority": -1}
            ]),
        );
        map.insert(
            "peers".to_string(),
            json!([peer("10.0.0.2", 51413, 2048), peer("10.0.0.3", 6881, 0)]),
        );
        map.insert(
            "trackerStats".to_string(),
            json!([tracker(0, "udp://tracker.example:1337/announce")]),
        );
    }
    value
}

/// File entry as found under `files`.
#[must_use]
pub fn file(name: &str, length: i64, completed: i64) -> Value {
    json!({"name": name, "length": length, "bytesCompleted": completed})
}

/// Peer entry as found under `peers`.
#[must_use]
pub fn peer(address: &str, port: u16, rate_to_client: i64) -> Value {
    json!({
        "address": address,
        "port": port,
        "clientName": "Transmission 4.0.5",
        "rateToClient": rate_to_client,
        "rateToPeer": 0,
        "progress": 0.25,
        "isEncrypted": true,
    })
}

/// Tracker entry as found under `trackerStats`.
#[must_use]
pub fn tracker(id: i64, announce: &str) -> Value {
    json!({
        "id": id,
        "announce": announce,
        "host": "tracker.example:1337",
        "tier": 0,
        "seederCount": 12,
        "leecherCount": 3,
        "lastAnnounceSucceeded": true,
    })
}

/// `torrent-get` response listing `torrents`.
#[must_use]
pub fn torrents(torrents: Vec<Value>) -> Value {
    json!({"result": "success", "arguments": {"torrents": torrents}})
}

/// `torrent-get` response for a `recently-active` query.
#[must_use]
pub fn recent_torrents(torrents: Vec<Value>, removed: &[i64]) -> Value {
    json!({"result": "success", "arguments": {"torrents": torrents, "removed": removed}})
}

/// `session-get` response.
#[must_use]
pub fn session() -> Value {
    json!({
        "result": "success",
        "arguments": {
            "version": "4.0.5 (a6fe2a64aa)",
            "rpc-version": 17,
            "rpc-version-minimum": 14,
            "download-dir": "/srv/torrents",
            "speed-limit-down": 500,
            "speed-limit-down-enabled": false,
            "speed-limit-up": 100,
            "speed-limit-up-enabled": true,
            "peer-port": 51413,
            "seedRatioLimit": 2.0,
            "seedRatioLimited": false,
            "encryption": "preferred",
        }
    })
}

/// `session-stats` response.
#[must_use]
pub fn session_stats(download_speed: i64, upload_speed: i64) -> Value {
    json!({
        "result": "success",
        "arguments": {
            "activeTorrentCount": 2,
            "pausedTorrentCount": 1,
            "torrentCount": 3,
            "downloadSpeed": download_speed,
            "uploadSpeed": upload_speed,
            "cumulative-stats": {
                "uploadedBytes": 10, "downloadedBytes": 20,
                "filesAdded": 3, "sessionCount": 4, "secondsActive": 500
            },
            "current-stats": {
                "uploadedBytes": 1, "downloadedBytes": 2,
                "filesAdded": 1, "sessionCount": 1, "secondsActive": 50
            }
        }
    })
}

/// `torrent-add` response; `key` is `torrent-added` or `torrent-duplicate`.
#[must_use]
pub fn added(key: &str, id: i64, name: &str, hash: &str) -> Value {
    json!({
        "result": "success",
        "arguments": {key: {"id": id, "name": name, "hashString": hash}}
    })
}

/// `free-space` response.
#[must_use]
pub fn free_space(path: &str, size: i64) -> Value {
    json!({"result": "success", "arguments": {"path": path, "size-bytes": size}})
}
