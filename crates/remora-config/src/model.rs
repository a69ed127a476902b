//! Typed client configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Connection, polling, and logging settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Daemon host name or address.
    pub host: String,
    /// Daemon RPC port.
    pub port: u16,
    /// RPC endpoint path.
    pub path: String,
    /// Use HTTPS.
    pub tls: bool,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
    /// Poll cycles between session configuration refreshes.
    pub session_refresh_every: u32,
    /// Consecutive timed-out cycles before a blocking notification.
    pub timeout_threshold: u32,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// `json` or `pretty`, in any case; inferred from the build when unset.
    pub log_format: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9091,
            path: "/transmission/rpc".to_string(),
            tls: false,
            username: None,
            password: None,
            poll_interval_secs: 5,
            request_timeout_secs: 10,
            session_refresh_every: 12,
            timeout_threshold: 3,
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}

impl ClientConfig {
    /// Reject values the client cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", Some(&self.host), "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", Some("0"), "must be non-zero"));
        }
        if !self.path.starts_with('/') {
            return Err(invalid("path", Some(&self.path), "must start with '/'"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", Some("0"), "must be non-zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", Some("0"), "must be non-zero"));
        }
        if self.session_refresh_every == 0 {
            return Err(invalid("session_refresh_every", Some("0"), "must be non-zero"));
        }
        if self.timeout_threshold == 0 {
            return Err(invalid("timeout_threshold", Some("0"), "must be non-zero"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(invalid("password", None, "requires a username"));
        }
        if let Some(format) = self.log_format.as_deref()
            && !matches!(format.trim().to_ascii_lowercase().as_str(), "json" | "pretty")
        {
            return Err(invalid("log_format", Some(format), "must be 'json' or 'pretty'"));
        }
        Ok(())
    }

    /// Daemon RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Endpoint`] if the parts do not form a URL.
    pub fn rpc_url(&self) -> ConfigResult<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}{}", self.host, self.port, self.path);
        Url::parse(&raw).map_err(|source| ConfigError::Endpoint { source })
    }

    /// Poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("session_refresh_every", &self.session_refresh_every)
            .field("timeout_threshold", &self.timeout_threshold)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn invalid(field: &'static str, value: Option<&str>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value: value.map(str::to_string),
        reason,
    }
}
