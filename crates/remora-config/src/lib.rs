#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Client configuration: defaults, an optional YAML file, then environment
//! overrides.
//!
//! Layout: `model.rs` (the typed config and its validation), `loader.rs`
//! (layering), `error.rs` (`ConfigError`).

pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, load, load_with};
pub use model::ClientConfig;
