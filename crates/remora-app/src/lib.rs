#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Remora application wiring.
//!
//! Layout:
//! - `poll.rs`: the periodic fetch-and-reconcile loop
//! - `actions.rs`: user-triggered daemon calls
//! - `notify.rs`: notifications derived from client failures
//! - `bootstrap.rs`: configuration, logging, and client wiring
//! - `cli.rs`: argument parsing for the `remora` binary
//! - `main.rs`: thin entrypoint delegating to `run()`

/// User-triggered daemon calls.
pub mod actions;
/// Application bootstrap.
pub mod bootstrap;
pub(crate) mod cli;
/// Application error types.
pub mod error;
/// Notifications for the presentation layer.
pub mod notify;
/// Poll loop.
pub mod poll;

pub use actions::ActionDispatcher;
pub use bootstrap::{BootstrapOptions, build_client, resolve_config, run_app, run_client};
pub use cli::run;
pub use error::{AppError, AppResult};
pub use notify::{Notification, Notifier, Severity, notification_channel};
pub use poll::{CycleOutcome, CycleSummary, PollLoop, PollSettings};
