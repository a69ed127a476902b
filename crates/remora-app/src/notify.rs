//! User-facing notifications derived from client failures.
//!
//! # Design
//! - Authorization failures and persistent timeouts block the user until
//!   resolved; failures of a single action are transient and dismissable.
//! - Delivery never waits: a full or closed channel drops the notification.

use std::fmt;

use remora_rpc::{ClientError, ErrorKind};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// How prominently a notification must be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Requires attention before the client is usable again.
    Blocking,
    /// Dismissable report tied to one action.
    Transient,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blocking => "blocking",
            Self::Transient => "transient",
        })
    }
}

/// A message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Display class.
    pub severity: Severity,
    /// Action that failed, `None` for background polling.
    pub action: Option<&'static str>,
    /// Text to show.
    pub message: String,
}

impl Notification {
    /// Notification for a failed user action.
    #[must_use]
    pub fn for_action(action: &'static str, err: &ClientError) -> Self {
        let severity = match err.kind() {
            ErrorKind::Authorization => Severity::Blocking,
            ErrorKind::Client | ErrorKind::Timeout | ErrorKind::Rpc => Severity::Transient,
        };
        Self {
            severity,
            action: Some(action),
            message: describe(err),
        }
    }

    /// Notification for a failed poll cycle, if the failure warrants one.
    ///
    /// Only authorization failures qualify; other single-cycle failures are
    /// retried by the next cycle.
    #[must_use]
    pub fn for_poll(err: &ClientError) -> Option<Self> {
        (err.kind() == ErrorKind::Authorization).then(|| Self {
            severity: Severity::Blocking,
            action: None,
            message: describe(err),
        })
    }

    /// Notification raised after `cycles` consecutive timed-out polls.
    #[must_use]
    pub fn persistent_timeout(cycles: u32) -> Self {
        Self {
            severity: Severity::Blocking,
            action: None,
            message: format!("daemon has not answered for {cycles} consecutive polls"),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Some(action) => write!(f, "[{}] {action}: {}", self.severity, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

fn describe(err: &ClientError) -> String {
    match err.header() {
        Some(header) => format!("{header}: {}", err.message()),
        None => err.message().to_string(),
    }
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

/// Create a notifier and the receiver the presentation layer drains.
#[must_use]
pub fn notification_channel(capacity: usize) -> (Notifier, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Notifier { tx }, rx)
}

impl Notifier {
    /// Log and deliver `notification`.
    pub fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Blocking => error!(
                action = notification.action,
                message = %notification.message,
                "blocking notification"
            ),
            Severity::Transient => warn!(
                action = notification.action,
                message = %notification.message,
                "transient notification"
            ),
        }
        if let Err(err) = self.tx.try_send(notification) {
            debug!(error = %err, "notification dropped");
        }
    }
}
