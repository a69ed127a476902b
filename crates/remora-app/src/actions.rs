//! User-triggered intents.
//!
//! Each action is an independent call outside the poll loop. Failures are
//! returned to the caller and also reported on the notification channel.

use std::future::Future;
use std::sync::Arc;

use remora_model::ModelStore;
use remora_rpc::{
    AddTorrent, ClientResult, FreeSpace, NullPolicy, RpcClient, SessionSettings, SpeedLimits,
    TorrentAddResult, TorrentIds, TorrentSetArgs,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::notify::{Notification, Notifier};

/// Entry point for presentation-layer actions.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    client: RpcClient,
    store: Arc<Mutex<ModelStore>>,
    notifier: Notifier,
}

impl ActionDispatcher {
    /// Dispatcher sharing the poll loop's client and store.
    #[must_use]
    pub const fn new(client: RpcClient, store: Arc<Mutex<ModelStore>>, notifier: Notifier) -> Self {
        Self {
            client,
            store,
            notifier,
        }
    }

    /// Resume torrents through the queue.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn start(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.dispatch("start", self.client.torrent_start(ids)).await
    }

    /// Resume torrents, bypassing the queue.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn start_now(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.dispatch("start now", self.client.torrent_start_now(ids))
            .await
    }

    /// Stop torrents.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn stop(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.dispatch("stop", self.client.torrent_stop(ids)).await
    }

    /// Re-check local data.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn verify(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.dispatch("verify", self.client.torrent_verify(ids)).await
    }

    /// Announce to trackers now.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn reannounce(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.dispatch("reannounce", self.client.torrent_reannounce(ids))
            .await
    }

    /// Remove torrents, optionally deleting their data.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn remove(&self, ids: &TorrentIds, delete_local_data: bool) -> ClientResult<()> {
        self.dispatch(
            "remove",
            self.client.torrent_remove(ids, delete_local_data),
        )
        .await
    }

    /// Set or clear per-torrent speed limits.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn set_limits(&self, ids: &TorrentIds, limits: SpeedLimits) -> ClientResult<()> {
        self.dispatch("set limits", self.client.torrent_set_limits(ids, limits))
            .await
    }

    /// Change torrent properties; unset fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn set(&self, ids: &TorrentIds, args: &TorrentSetArgs) -> ClientResult<()> {
        self.dispatch("set", self.client.torrent_set(ids, args, NullPolicy::Omit))
            .await
    }

    /// Add a torrent.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn add(&self, add: &AddTorrent) -> ClientResult<Option<TorrentAddResult>> {
        self.dispatch("add", self.client.torrent_add(add)).await
    }

    /// Change daemon settings; unset fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn configure(&self, settings: &SessionSettings) -> ClientResult<()> {
        self.dispatch(
            "configure",
            self.client.session_set(settings, NullPolicy::Omit),
        )
        .await
    }

    /// Free space at `path` on the daemon host.
    ///
    /// # Errors
    ///
    /// Returns the client error after reporting it as a notification.
    pub async fn free_space(&self, path: &str) -> ClientResult<Option<FreeSpace>> {
        self.dispatch("free space", self.client.free_space(path))
            .await
    }

    /// Set the local pin on a torrent. Returns `false` if it is not in the store.
    pub async fn pin(&self, hash: &str, pinned: bool) -> bool {
        self.store.lock().await.set_pinned(hash, pinned)
    }

    async fn dispatch<T, F>(&self, action: &'static str, call: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        match call.await {
            Ok(value) => {
                debug!(action, "action completed");
                Ok(value)
            }
            Err(err) => {
                self.notifier.notify(Notification::for_action(action, &err));
                Err(err)
            }
        }
    }
}
