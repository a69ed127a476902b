//! Tag allocation and request/response correlation.
//!
//! Each call takes a fresh tag from an atomic counter and parks a waiter under
//! it. A decoded response completes the waiter registered under its tag;
//! responses carrying a tag nobody is waiting for are logged and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::wire::Response;

/// Caller-assigned integer correlating a request with its response.
pub type Tag = u64;

/// Waiter handed to the caller by [`TagCorrelator::associate`].
pub type Waiter = oneshot::Receiver<Response>;

/// Issues tags and matches responses to pending calls.
#[derive(Debug)]
pub struct TagCorrelator {
    next: AtomicU64,
    pending: Mutex<HashMap<Tag, oneshot::Sender<Response>>>,
}

impl TagCorrelator {
    /// Correlator whose first tag is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Next unused tag. Safe under concurrent callers.
    pub fn allocate(&self) -> Tag {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a pending caller under `tag`.
    ///
    /// Re-associating a tag replaces the previous waiter, which then observes a
    /// closed channel.
    pub fn associate(&self, tag: Tag) -> Waiter {
        let (sender, receiver) = oneshot::channel();
        if self.lock().insert(tag, sender).is_some() {
            warn!(tag, "replaced an existing waiter for tag");
        }
        receiver
    }

    /// Complete the waiter registered under `tag`.
    ///
    /// Returns `false` when no caller is waiting for `tag`; the response is
    /// dropped.
    pub fn resolve(&self, tag: Tag, response: Response) -> bool {
        let Some(sender) = self.lock().remove(&tag) else {
            warn!(tag, "dropping response with unmatched tag");
            return false;
        };
        if sender.send(response).is_err() {
            debug!(tag, "waiter went away before its response arrived");
            return false;
        }
        true
    }

    /// Forget the waiter for `tag` after a failed or abandoned call.
    pub fn abandon(&self, tag: Tag) -> bool {
        self.lock().remove(&tag).is_some()
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Tag, oneshot::Sender<Response>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TagCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tokio::task;

    use super::*;

    fn response(tag: Tag) -> Response {
        Response {
            result: "success".into(),
            tag: Some(tag),
            arguments: None,
        }
    }

    #[test]
    fn tags_increase_monotonically() {
        let tags = TagCorrelator::new();
        let first = tags.allocate();
        let second = tags.allocate();
        assert_eq!(first, 1);
        assert!(second > first);
    }

    #[tokio::test]
    async fn concurrent_allocation_never_repeats() {
        let tags = Arc::new(TagCorrelator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let tags = Arc::clone(&tags);
            handles.push(task::spawn(async move {
                (0..250).map(|_| tags.allocate()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for tag in handle.await.expect("allocation task panicked") {
                assert!(seen.insert(tag), "tag {tag} issued twice");
            }
        }
        assert_eq!(seen.len(), 2_000);
    }

    #[tokio::test]
    async fn responses_complete_in_arrival_order() {
        let tags = TagCorrelator::new();
        let first = tags.allocate();
        let second = tags.allocate();
        let first_waiter = tags.associate(first);
        let second_waiter = tags.associate(second);

        assert!(tags.resolve(second, response(second)));
        let got = second_waiter.await.expect("second resolved");
        assert_eq!(got.tag, Some(second));
        assert_eq!(tags.pending(), 1);

        assert!(tags.resolve(first, response(first)));
        assert_eq!(first_waiter.await.expect("first resolved").tag, Some(first));
        assert_eq!(tags.pending(), 0);
    }

    #[tokio::test]
    async fn unmatched_tag_completes_nobody() {
        let tags = TagCorrelator::new();
        let tag = tags.allocate();
        let mut waiter = tags.associate(tag);

        assert!(!tags.resolve(tag + 100, response(tag + 100)));
        assert!(waiter.try_recv().is_err());
        assert_eq!(tags.pending(), 1);

        assert!(tags.abandon(tag));
        assert!(waiter.await.is_err());
    }

    #[test]
    fn resolving_after_waiter_dropped_reports_failure() {
        let tags = TagCorrelator::new();
        let tag = tags.allocate();
        drop(tags.associate(tag));
        assert!(!tags.resolve(tag, response(tag)));
        assert!(!tags.abandon(tag));
    }
}
