#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Client side of the torrent daemon's JSON RPC protocol.
//!
//! Layout:
//! - `wire/`: literal wire keys, request builders, and response DTOs
//! - `error.rs`: the four-kind error taxonomy surfaced to callers
//! - `tags.rs`: tag allocation and request/response correlation
//! - `transport.rs`: HTTP transport with session-token handshake
//! - `decode.rs`: fault-tolerant, per-method response decoding
//! - `client.rs`: typed calls for every method in the catalogue

pub mod client;
pub mod decode;
pub mod error;
pub mod tags;
pub mod transport;
pub mod wire;

pub use client::{RpcClient, RpcSession};
pub use decode::decode;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use tags::{Tag, TagCorrelator};
pub use transport::{Credentials, HttpTransport, RpcTransport, SESSION_HEADER, TransportOptions};
pub use wire::{
    AddTorrent, FileInfo, FileStat, FreeSpace, NullPolicy, PeerInfo, Request, Response,
    ResponseArguments, RpcMethod, SessionField, SessionInfo, SessionSettings, SessionStats,
    SpeedLimits, Stats, TorrentAddResult, TorrentField, TorrentIds, TorrentInfo, TorrentList,
    TorrentSetArgs, TrackerStatInfo,
};
