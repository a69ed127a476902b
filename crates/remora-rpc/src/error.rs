//! Error taxonomy for daemon RPC calls.
//!
//! # Design
//! - Every failure a caller sees is one of four kinds: generic client,
//!   authorization, timeout, or daemon-reported RPC failure.
//! - Lower-level causes are kept as boxed sources so transport crate types never
//!   appear in the public signature.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed source error preserved for diagnostics.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Convenience alias for RPC results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catch-all client failure.
    Client,
    /// Credentials or session were rejected.
    Authorization,
    /// Host unreachable or deadline elapsed.
    Timeout,
    /// The daemon reported a failure.
    Rpc,
}

/// Root error type for every daemon interaction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Generic failure not covered by a more specific kind.
    #[error("client error: {message}")]
    Client {
        /// Human-readable description.
        message: String,
        /// Underlying cause when available.
        #[source]
        source: Option<BoxError>,
    },
    /// Credential or permission failure.
    #[error("authorization failed: {message}")]
    Authorization {
        /// Human-readable description.
        message: String,
    },
    /// Daemon unreachable or too slow to answer.
    #[error("daemon timed out: {message}")]
    Timeout {
        /// Human-readable description.
        message: String,
        /// Underlying cause when available.
        #[source]
        source: Option<BoxError>,
    },
    /// Failure reported by the daemon itself.
    #[error("rpc error ({header}): {message}")]
    Rpc {
        /// Distinct header text reported by the daemon (status line or method).
        header: String,
        /// Daemon message body or result string.
        message: String,
    },
}

impl ClientError {
    /// Build a generic client error without a source.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Build a generic client error preserving its cause.
    pub fn client_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Build a timeout error without a source.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            source: None,
        }
    }

    /// Build a daemon-reported RPC error.
    pub fn rpc(header: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            header: header.into(),
            message: message.into(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Client { .. } => ErrorKind::Client,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Rpc { .. } => ErrorKind::Rpc,
        }
    }

    /// Header text for RPC errors.
    #[must_use]
    pub fn header(&self) -> Option<&str> {
        match self {
            Self::Rpc { header, .. } => Some(header),
            _ => None,
        }
    }

    /// Message without the kind prefix, suitable for notifications.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Client { message, .. }
            | Self::Authorization { message }
            | Self::Timeout { message, .. }
            | Self::Rpc { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(source: serde_json::Error) -> Self {
        Self::client_with("failed to encode request", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_every_variant() {
        assert_eq!(ClientError::client("x").kind(), ErrorKind::Client);
        assert_eq!(
            ClientError::authorization("x").kind(),
            ErrorKind::Authorization
        );
        assert_eq!(ClientError::timeout("x").kind(), ErrorKind::Timeout);
        assert_eq!(ClientError::rpc("h", "x").kind(), ErrorKind::Rpc);
    }

    #[test]
    fn rpc_error_carries_header_alongside_message() {
        let err = ClientError::rpc("500 Internal Server Error", "boom");
        assert_eq!(err.header(), Some("500 Internal Server Error"));
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "rpc error (500 Internal Server Error): boom");
        assert!(ClientError::timeout("slow").header().is_none());
    }

    #[test]
    fn client_error_preserves_source() {
        let io = std::io::Error::other("disk");
        let err = ClientError::client_with("read failed", io);
        let source = StdError::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk"));
    }
}
