//! # Design
//!
//! - Centralize application-level errors for bootstrap and the poll loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use remora_rpc::ErrorKind;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: remora_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: remora_telemetry::TelemetryError,
    },
    /// Daemon client operations failed.
    #[error("daemon client operation failed")]
    Client {
        /// Operation identifier.
        operation: &'static str,
        /// Source client error.
        source: remora_rpc::ClientError,
    },
    /// A poll cycle did not complete.
    #[error("poll cycle did not complete")]
    Poll {
        /// Cycle number.
        cycle: u64,
        /// Failure class, `None` when the cycle deadline elapsed.
        kind: Option<ErrorKind>,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: remora_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: remora_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn client(operation: &'static str, source: remora_rpc::ClientError) -> Self {
        Self::Client { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "config.load",
            remora_config::ConfigError::InvalidEnv {
                name: "REMORA_PORT".into(),
                value: "x".into(),
            },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "config.load",
                ..
            }
        ));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let client = AppError::client("client.build", remora_rpc::ClientError::client("bad url"));
        assert!(matches!(client, AppError::Client { operation: "client.build", .. }));

        let io = AppError::io("signal.ctrl_c", io::Error::other("closed"));
        assert!(matches!(io, AppError::Io { operation: "signal.ctrl_c", .. }));
    }

    #[test]
    fn poll_error_has_constant_message() {
        let err = AppError::Poll {
            cycle: 3,
            kind: Some(ErrorKind::Authorization),
        };
        assert_eq!(err.to_string(), "poll cycle did not complete");
        assert!(err.source().is_none());
    }
}
