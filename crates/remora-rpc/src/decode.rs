//! Fault-tolerant response decoding.
//!
//! The envelope (`result`, `tag`) must decode for a response to exist at all.
//! The `arguments` payload is decoded per method and degrades to `None` when
//! it does not fit the expected shape, so a daemon speaking a slightly
//! different protocol version still yields usable result/tag pairs.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::tags::Tag;
use crate::wire::{
    FreeSpace, Response, ResponseArguments, RpcMethod, SessionInfo, SessionStats,
    TorrentAddResult, TorrentInfo, TorrentList,
};

const ADDED_KEY: &str = "torrent-added";
const IDENTITY_KEY: &str = "hashString";
const DUPLICATE_KEY: &str = "torrent-duplicate";

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    tag: Option<Tag>,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AddedTorrent {
    #[serde(rename = "id")]
    id: Option<i64>,
    #[serde(rename = "name")]
    name: Option<String>,
    #[serde(rename = "hashString")]
    hash_string: Option<String>,
}

/// Decode a raw response produced by `method`.
///
/// Returns `None` for empty or malformed input, or an envelope without a
/// `result`. Never panics.
#[must_use]
pub fn decode(method: RpcMethod, raw: &[u8]) -> Option<Response> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        debug!(%method, "empty response payload");
        return None;
    }

    let envelope: RawEnvelope = match serde_json::from_slice(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(%method, error = %err, "response envelope did not parse");
            return None;
        }
    };
    let result = envelope.result?;

    let arguments = envelope
        .arguments
        .filter(|value| !value.is_null())
        .and_then(|value| decode_arguments(method, value));

    Some(Response {
        result,
        tag: envelope.tag,
        arguments,
    })
}

fn decode_arguments(method: RpcMethod, value: Value) -> Option<ResponseArguments> {
    match method {
        RpcMethod::SessionGet => nested::<SessionInfo>(method, value).map(ResponseArguments::Session),
        RpcMethod::SessionStats => nested::<SessionStats>(method, value)
            .map(ResponseArguments::SessionStats),
        RpcMethod::TorrentGet => torrent_list(method, value).map(ResponseArguments::Torrents),
        RpcMethod::TorrentAdd => torrent_added(method, value).map(ResponseArguments::TorrentAdded),
        RpcMethod::FreeSpace => nested::<FreeSpace>(method, value).map(ResponseArguments::FreeSpace),
        RpcMethod::SessionSet
        | RpcMethod::TorrentSet
        | RpcMethod::TorrentRemove
        | RpcMethod::TorrentStart
        | RpcMethod::TorrentStartNow
        | RpcMethod::TorrentStop
        | RpcMethod::TorrentVerify
        | RpcMethod::TorrentReannounce => Some(ResponseArguments::Empty),
    }
}

fn nested<T: DeserializeOwned>(method: RpcMethod, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(%method, error = %err, "nested response payload did not decode; treating as absent");
            None
        }
    }
}

fn as_object(method: RpcMethod, value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        other => {
            warn!(%method, kind = json_kind(&other), "response arguments are not an object");
            None
        }
    }
}

fn torrent_list(method: RpcMethod, value: Value) -> Option<TorrentList> {
    let mut map = as_object(method, value)?;

    let torrents = match map.remove("torrents") {
        Some(Value::Array(items)) => items.into_iter().filter_map(torrent_entry).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(%method, kind = json_kind(&other), "torrents payload is not an array");
            return None;
        }
    };

    let removed = match map.remove("removed") {
        Some(Value::Array(items)) => Some(items.iter().filter_map(Value::as_i64).collect()),
        _ => None,
    };

    Some(TorrentList { torrents, removed })
}

/// Decode one torrent, dropping individual fields that do not fit their type.
///
/// Only an undecodable entry or identity hash discards the whole torrent.
fn torrent_entry(item: Value) -> Option<TorrentInfo> {
    let err = match serde_json::from_value::<TorrentInfo>(item.clone()) {
        Ok(torrent) => return Some(torrent),
        Err(err) => err,
    };
    let Value::Object(fields) = item else {
        debug!(error = %err, "skipping torrent that is not an object");
        return None;
    };

    let mut kept = Map::new();
    let mut dropped = Vec::new();
    for (key, value) in fields {
        let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
        if serde_json::from_value::<TorrentInfo>(single).is_ok() {
            kept.insert(key, value);
        } else {
            dropped.push(key);
        }
    }
    if dropped.iter().any(|key| key == IDENTITY_KEY) {
        debug!(error = %err, "skipping torrent whose hash did not decode");
        return None;
    }

    warn!(fields = ?dropped, "dropping torrent fields that did not decode");
    serde_json::from_value(Value::Object(kept)).ok()
}

/// The add result shares one envelope for both outcomes; the nested key decides
/// which outcome it is.
fn torrent_added(method: RpcMethod, value: Value) -> Option<TorrentAddResult> {
    let mut map = as_object(method, value)?;
    let (payload, is_duplicate) = if let Some(payload) = map.remove(DUPLICATE_KEY) {
        (payload, true)
    } else if let Some(payload) = map.remove(ADDED_KEY) {
        (payload, false)
    } else {
        warn!(%method, "add result carries neither an added nor a duplicate torrent");
        return None;
    };

    let added: AddedTorrent = nested(method, payload)?;
    Some(TorrentAddResult {
        id: added.id.unwrap_or_default(),
        name: added.name.unwrap_or_default(),
        hash_string: added.hash_string.unwrap_or_default(),
        is_duplicate,
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
