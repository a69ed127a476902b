//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Environment override could not be parsed.
    #[error("invalid environment override")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },
    /// Configuration file could not be read.
    #[error("failed to read configuration file")]
    Io {
        /// File path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Configuration file was not valid YAML for the config shape.
    #[error("failed to parse configuration file")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Source parse error.
        source: serde_yaml::Error,
    },
    /// Endpoint URL could not be assembled.
    #[error("invalid daemon endpoint")]
    Endpoint {
        /// Source URL error.
        source: url::ParseError,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
