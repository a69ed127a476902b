//! Periodic synchronisation of the model store with the daemon.
//!
//! # Design
//! - One cycle at a time; missed ticks are delayed rather than burst.
//! - A cycle fetches session statistics and torrents concurrently, and the
//!   session configuration every `session_refresh_every` cycles.
//! - The first cycle and every refresh cycle fetch the full torrent list; the
//!   cycles between fetch the `recently-active` delta.
//! - The fetch runs detached so an elapsed deadline abandons the cycle without
//!   cancelling requests already on the wire.

use std::sync::Arc;
use std::time::Duration;

use remora_config::ClientConfig;
use remora_model::{ModelStore, ReconcileReport};
use remora_rpc::{
    ClientError, ClientResult, ErrorKind, RpcClient, SessionInfo, SessionStats, TorrentIds,
    TorrentList,
};
use tokio::sync::{Mutex, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::notify::{Notification, Notifier};

/// Exchanges one call may need: the rejected attempt and the handshake retry.
const EXCHANGES_PER_CALL: u32 = 2;
/// Slack on top of the exchanges for scheduling and decoding.
const DEADLINE_MARGIN: Duration = Duration::from_secs(1);

/// Timing knobs for [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Deadline for one cycle.
    pub deadline: Duration,
    /// Cycles between session configuration and full list refreshes.
    pub session_refresh_every: u32,
    /// Consecutive timed-out cycles before a blocking notification.
    pub timeout_threshold: u32,
}

impl PollSettings {
    /// Settings taken from the client configuration.
    ///
    /// The cycle deadline covers a session handshake, where each call may
    /// spend two request timeouts before it completes or fails.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            deadline: config
                .request_timeout()
                .saturating_mul(EXCHANGES_PER_CALL)
                .saturating_add(DEADLINE_MARGIN),
            session_refresh_every: config.session_refresh_every,
            timeout_threshold: config.timeout_threshold,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Snapshots were fetched and reconciled.
    Completed,
    /// A call failed; the store was left untouched.
    Failed {
        /// Failure class.
        kind: ErrorKind,
        /// Failure description.
        message: String,
    },
    /// The cycle deadline elapsed or the daemon timed out.
    TimedOut,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Whether the full torrent list was requested.
    pub full: bool,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// Changes applied to the store.
    pub report: ReconcileReport,
    /// Torrents in the store after the cycle.
    pub torrents: usize,
}

impl CycleSummary {
    pub(crate) fn log(&self) {
        match &self.outcome {
            CycleOutcome::Completed => info!(
                cycle = self.cycle,
                full = self.full,
                torrents = self.torrents,
                added = self.report.added,
                removed = self.report.removed,
                updated = self.report.updated,
                "poll cycle completed"
            ),
            CycleOutcome::Failed { kind, message } => warn!(
                cycle = self.cycle,
                kind = ?kind,
                error = %message,
                "poll cycle failed"
            ),
            CycleOutcome::TimedOut => warn!(cycle = self.cycle, "poll cycle abandoned after deadline"),
        }
    }
}

#[derive(Debug, Default)]
struct Fetched {
    session: Option<SessionInfo>,
    stats: Option<SessionStats>,
    torrents: Option<TorrentList>,
}

/// Drives periodic fetch-and-reconcile cycles.
#[derive(Debug)]
pub struct PollLoop {
    client: RpcClient,
    store: Arc<Mutex<ModelStore>>,
    notifier: Notifier,
    settings: PollSettings,
    cycle: u64,
    since_full: u32,
    needs_full: bool,
    consecutive_timeouts: u32,
    blocked: bool,
}

impl PollLoop {
    /// Poll loop feeding `store`.
    #[must_use]
    pub const fn new(
        client: RpcClient,
        store: Arc<Mutex<ModelStore>>,
        notifier: Notifier,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            store,
            notifier,
            settings,
            cycle: 0,
            since_full: 0,
            needs_full: true,
            consecutive_timeouts: 0,
            blocked: false,
        }
    }

    /// Cycles started so far.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run cycles on the configured interval until `shutdown` turns true or
    /// its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval = ?self.settings.interval,
            deadline = ?self.settings.deadline,
            "poll loop started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once().await.log();
                }
            }
        }

        info!(cycles = self.cycle, "poll loop stopped");
    }

    /// Run a single cycle now.
    pub async fn run_once(&mut self) -> CycleSummary {
        self.cycle += 1;
        let full = self.needs_full || self.since_full >= self.settings.session_refresh_every;
        debug!(cycle = self.cycle, full, "poll cycle starting");

        let client = self.client.clone();
        let mut task = tokio::spawn(async move { fetch(&client, full).await });

        let (outcome, report) = match time::timeout(self.settings.deadline, &mut task).await {
            Ok(Ok(Ok(fetched))) => {
                let report = self.apply(fetched, full).await;
                self.on_success(full);
                (CycleOutcome::Completed, report)
            }
            Ok(Ok(Err(err))) => (self.on_failure(&err), ReconcileReport::default()),
            Ok(Err(join)) => {
                let err = ClientError::client_with("poll fetch task failed", join);
                (self.on_failure(&err), ReconcileReport::default())
            }
            Err(_) => (self.on_timeout(), ReconcileReport::default()),
        };

        CycleSummary {
            cycle: self.cycle,
            full,
            outcome,
            report,
            torrents: self.store.lock().await.torrents().len(),
        }
    }

    async fn apply(&self, fetched: Fetched, full: bool) -> ReconcileReport {
        let mut store = self.store.lock().await;
        let mut report = ReconcileReport::default();
        if let Some(session) = fetched.session {
            report += store.apply_session(session);
        }
        if let Some(stats) = fetched.stats {
            report += store.apply_session_stats(stats);
        }
        if let Some(list) = fetched.torrents {
            report += if full {
                store.apply_torrents(list.torrents)
            } else {
                store.apply_torrent_delta(list)
            };
        }
        report
    }

    fn on_success(&mut self, full: bool) {
        if full {
            self.needs_full = false;
            self.since_full = 1;
        } else {
            self.since_full += 1;
        }
        self.consecutive_timeouts = 0;
        self.blocked = false;
    }

    fn on_failure(&mut self, err: &ClientError) -> CycleOutcome {
        if err.kind() == ErrorKind::Timeout {
            return self.on_timeout();
        }
        self.consecutive_timeouts = 0;
        if let Some(notification) = Notification::for_poll(err) {
            if !self.blocked {
                self.notifier.notify(notification);
            }
            self.blocked = true;
        }
        CycleOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    fn on_timeout(&mut self) -> CycleOutcome {
        self.consecutive_timeouts += 1;
        if self.consecutive_timeouts == self.settings.timeout_threshold {
            self.notifier
                .notify(Notification::persistent_timeout(self.consecutive_timeouts));
        }
        CycleOutcome::TimedOut
    }
}

async fn fetch(client: &RpcClient, full: bool) -> ClientResult<Fetched> {
    let session = async {
        if full {
            client.session_get(&[]).await
        } else {
            Ok(None)
        }
    };
    let torrents = async {
        if full {
            client.torrent_get(&TorrentIds::All, &[]).await
        } else {
            client.torrent_get_recent(&[]).await
        }
    };
    let (session, stats, torrents) = tokio::join!(session, client.session_stats(), torrents);
    Ok(Fetched {
        session: session?,
        stats: stats?,
        torrents: torrents?,
    })
}

#[cfg(test)]
mod tests {
    use std::future;
    use std::sync::Mutex as StdMutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use remora_rpc::{RpcTransport, TransportOptions};
    use remora_test_support::{FakeDaemon, fixtures};
    use serde_json::Value;
    use url::Url;

    use super::*;
    use crate::notify::{Severity, notification_channel};

    const SETTINGS: PollSettings = PollSettings {
        interval: Duration::from_millis(20),
        deadline: Duration::from_secs(5),
        session_refresh_every: 3,
        timeout_threshold: 2,
    };

    fn daemon_state(request: &Value) -> Value {
        match request["method"].as_str() {
            Some("session-get") => fixtures::session(),
            Some("session-stats") => fixtures::session_stats(100, 50),
            Some("torrent-get") if request["arguments"]["ids"] == "recently-active" => {
                fixtures::recent_torrents(vec![fixtures::torrent(3, "c", "C")], &[1])
            }
            Some("torrent-get") => fixtures::torrents(vec![
                fixtures::torrent(1, "a", "A"),
                fixtures::torrent(2, "b", "B"),
            ]),
            _ => fixtures::success(),
        }
    }

    fn http_client(daemon: &FakeDaemon) -> Result<RpcClient> {
        Ok(RpcClient::over_http(
            Url::parse(&daemon.url())?,
            TransportOptions::default(),
        )?)
    }

    async fn hashes(store: &Mutex<ModelStore>) -> Vec<String> {
        store
            .lock()
            .await
            .torrents()
            .iter()
            .map(|torrent| torrent.read().hash_string.clone())
            .collect()
    }

    struct Stalled;

    #[async_trait]
    impl RpcTransport for Stalled {
        async fn send(&self, _body: Vec<u8>) -> ClientResult<Vec<u8>> {
            future::pending().await
        }
    }

    struct Unreachable;

    #[async_trait]
    impl RpcTransport for Unreachable {
        async fn send(&self, _body: Vec<u8>) -> ClientResult<Vec<u8>> {
            Err(ClientError::timeout("connection timed out"))
        }
    }

    /// Fails every call with the currently selected error kind.
    struct Failing(StdMutex<ErrorKind>);

    impl Failing {
        fn set(&self, kind: ErrorKind) {
            if let Ok(mut current) = self.0.lock() {
                *current = kind;
            }
        }
    }

    #[async_trait]
    impl RpcTransport for Failing {
        async fn send(&self, _body: Vec<u8>) -> ClientResult<Vec<u8>> {
            let kind = self.0.lock().map(|kind| *kind).unwrap_or(ErrorKind::Timeout);
            Err(match kind {
                ErrorKind::Timeout => ClientError::timeout("connection timed out"),
                _ => ClientError::rpc("500 Internal Server Error", "daemon exploded"),
            })
        }
    }

    #[test]
    fn deadline_leaves_room_for_a_handshake_retry() {
        let config = ClientConfig {
            request_timeout_secs: 10,
            ..ClientConfig::default()
        };
        let settings = PollSettings::from_config(&config);
        assert!(settings.deadline > config.request_timeout() * 2);
        assert_eq!(settings.deadline, Duration::from_secs(21));
        assert_eq!(settings.interval, config.poll_interval());
    }

    #[tokio::test]
    async fn other_failures_reset_the_timeout_streak() {
        let transport = Arc::new(Failing(StdMutex::new(ErrorKind::Timeout)));
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, mut rx) = notification_channel(8);
        let client = RpcClient::new(Arc::clone(&transport) as Arc<dyn RpcTransport>);
        let mut poll = PollLoop::new(client, store, notifier, SETTINGS);

        assert_eq!(poll.run_once().await.outcome, CycleOutcome::TimedOut);
        transport.set(ErrorKind::Rpc);
        assert!(matches!(
            poll.run_once().await.outcome,
            CycleOutcome::Failed {
                kind: ErrorKind::Rpc,
                ..
            }
        ));
        transport.set(ErrorKind::Timeout);
        assert_eq!(poll.run_once().await.outcome, CycleOutcome::TimedOut);
        assert!(rx.try_recv().is_err());

        assert_eq!(poll.run_once().await.outcome, CycleOutcome::TimedOut);
        assert_eq!(
            rx.try_recv().map(|n| n.severity).ok(),
            Some(Severity::Blocking)
        );
    }

    #[tokio::test]
    async fn first_cycle_is_full_and_later_cycles_apply_deltas() -> Result<()> {
        let daemon = FakeDaemon::builder().respond_with(daemon_state).spawn().await?;
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, _rx) = notification_channel(8);
        let mut poll = PollLoop::new(http_client(&daemon)?, Arc::clone(&store), notifier, SETTINGS);

        let first = poll.run_once().await;
        assert_eq!(first.outcome, CycleOutcome::Completed);
        assert!(first.full);
        assert_eq!(first.torrents, 2);
        assert_eq!(first.report.added, 2);
        assert_eq!(daemon.received().len(), 3);
        assert_eq!(store.lock().await.session().read().download_dir, "/srv/torrents");

        let second = poll.run_once().await;
        assert_eq!(second.outcome, CycleOutcome::Completed);
        assert!(!second.full);
        assert_eq!(hashes(&store).await, ["b", "c"]);

        let received = daemon.received();
        assert_eq!(received.len(), 5);
        assert!(received[3..].iter().all(|request| request["method"] != "session-get"));
        Ok(())
    }

    #[tokio::test]
    async fn full_refresh_recurs_on_schedule() -> Result<()> {
        let daemon = FakeDaemon::builder().respond_with(daemon_state).spawn().await?;
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, _rx) = notification_channel(8);
        let mut poll = PollLoop::new(http_client(&daemon)?, store, notifier, SETTINGS);

        let mut schedule = Vec::new();
        for _ in 0..4 {
            schedule.push(poll.run_once().await.full);
        }
        assert_eq!(schedule, [true, false, false, true]);
        assert_eq!(poll.cycles(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn persistent_timeouts_raise_one_blocking_notification() {
        let settings = PollSettings {
            deadline: Duration::from_millis(30),
            ..SETTINGS
        };
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, mut rx) = notification_channel(8);
        let mut poll = PollLoop::new(RpcClient::new(Arc::new(Stalled)), store, notifier, settings);

        for _ in 0..3 {
            let summary = poll.run_once().await;
            assert_eq!(summary.outcome, CycleOutcome::TimedOut);
            assert!(summary.full);
        }

        let notification = rx.try_recv().expect("threshold reached");
        assert_eq!(notification.severity, Severity::Blocking);
        assert_eq!(notification.action, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn transport_timeouts_count_toward_the_threshold() {
        let settings = PollSettings {
            timeout_threshold: 1,
            ..SETTINGS
        };
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, mut rx) = notification_channel(8);
        let mut poll =
            PollLoop::new(RpcClient::new(Arc::new(Unreachable)), store, notifier, settings);

        assert_eq!(poll.run_once().await.outcome, CycleOutcome::TimedOut);
        assert_eq!(
            rx.try_recv().map(|n| n.severity).ok(),
            Some(Severity::Blocking)
        );
    }

    #[tokio::test]
    async fn authorization_failure_notifies_once() -> Result<()> {
        let daemon = FakeDaemon::builder()
            .credentials("admin", "secret")
            .respond_with(daemon_state)
            .spawn()
            .await?;
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, mut rx) = notification_channel(8);
        let mut poll = PollLoop::new(http_client(&daemon)?, store, notifier, SETTINGS);

        for _ in 0..2 {
            let summary = poll.run_once().await;
            assert!(matches!(
                summary.outcome,
                CycleOutcome::Failed {
                    kind: ErrorKind::Authorization,
                    ..
                }
            ));
        }
        assert_eq!(
            rx.try_recv().map(|n| n.severity).ok(),
            Some(Severity::Blocking)
        );
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn failed_cycle_leaves_the_store_untouched() -> Result<()> {
        let daemon = FakeDaemon::builder()
            .respond_with(|request| {
                if request["method"] == "torrent-get" {
                    fixtures::failure("unrecognized info")
                } else {
                    daemon_state(request)
                }
            })
            .spawn()
            .await?;
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, mut rx) = notification_channel(8);
        let mut poll = PollLoop::new(http_client(&daemon)?, Arc::clone(&store), notifier, SETTINGS);

        let summary = poll.run_once().await;
        assert!(matches!(
            summary.outcome,
            CycleOutcome::Failed {
                kind: ErrorKind::Rpc,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
        assert!(store.lock().await.session().read().download_dir.is_empty());

        // The next cycle still asks for the full list.
        assert!(poll.run_once().await.full);
        Ok(())
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_is_signalled() -> Result<()> {
        let daemon = FakeDaemon::builder().respond_with(daemon_state).spawn().await?;
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, _rx) = notification_channel(8);
        let mut poll = PollLoop::new(http_client(&daemon)?, Arc::clone(&store), notifier, SETTINGS);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            poll.run(rx).await;
            poll.cycles()
        });
        for _ in 0..200 {
            if store.lock().await.torrents().len() == 2 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true)?;

        assert!(handle.await? >= 1);
        assert_eq!(hashes(&store).await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn run_returns_immediately_after_prior_shutdown() {
        let store = Arc::new(Mutex::new(ModelStore::default()));
        let (notifier, _rx) = notification_channel(8);
        let mut poll = PollLoop::new(RpcClient::new(Arc::new(Stalled)), store, notifier, SETTINGS);
        let (tx, rx) = watch::channel(true);
        poll.run(rx).await;
        drop(tx);
        assert_eq!(poll.cycles(), 0);
    }
}
