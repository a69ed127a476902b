#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared test helpers used across the workspace.
//! Layout: fixtures.rs (daemon JSON payload builders), daemon.rs (in-process fake daemon).

pub mod daemon;
pub mod fixtures;

pub use daemon::{FakeDaemon, FakeDaemonBuilder, RPC_PATH, SESSION_HEADER};
