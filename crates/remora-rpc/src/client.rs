//! Typed client over a transport and tag correlator.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::decode::decode;
use crate::error::{ClientError, ClientResult};
use crate::tags::{Tag, TagCorrelator};
use crate::transport::{HttpTransport, RpcTransport, TransportOptions};
use crate::wire::{
    AddTorrent, FreeSpace, NullPolicy, Request, Response, ResponseArguments, RpcMethod,
    SessionField, SessionInfo, SessionSettings, SessionStats, SpeedLimits, TorrentAddResult,
    TorrentField, TorrentIds, TorrentList, TorrentSetArgs, to_arguments,
};

/// Per-connection context: the transport plus the tag counter.
pub struct RpcSession {
    transport: Arc<dyn RpcTransport>,
    tags: TagCorrelator,
}

impl RpcSession {
    /// Session over `transport` with a fresh tag counter.
    #[must_use]
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            tags: TagCorrelator::new(),
        }
    }

    /// Tag correlator shared by every call on this session.
    #[must_use]
    pub const fn tags(&self) -> &TagCorrelator {
        &self.tags
    }
}

impl fmt::Debug for RpcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSession")
            .field("pending", &self.tags.pending())
            .finish_non_exhaustive()
    }
}

/// Cheaply cloneable handle issuing typed calls against one daemon.
#[derive(Debug, Clone)]
pub struct RpcClient {
    session: Arc<RpcSession>,
}

/// Drops the waiter for a tag when the call ends, however it ends.
struct PendingCall<'a> {
    tags: &'a TagCorrelator,
    tag: Tag,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        self.tags.abandon(self.tag);
    }
}

impl RpcClient {
    /// Client over an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            session: Arc::new(RpcSession::new(transport)),
        }
    }

    /// Client over HTTP.
    ///
    /// # Errors
    ///
    /// Returns a client error if the HTTP transport cannot be built.
    pub fn over_http(endpoint: Url, options: TransportOptions) -> ClientResult<Self> {
        let transport = HttpTransport::new(endpoint, options)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Session context backing this client.
    #[must_use]
    pub fn session(&self) -> &RpcSession {
        &self.session
    }

    /// Issue `method` and return the successful response.
    ///
    /// # Errors
    ///
    /// - transport failures as classified by the transport
    /// - [`ClientError::Client`] when the envelope does not decode or its tag
    ///   does not match the request
    /// - [`ClientError::Rpc`] when the daemon reports a non-success result
    pub async fn call(
        &self,
        method: RpcMethod,
        arguments: Map<String, Value>,
    ) -> ClientResult<Response> {
        let tags = &self.session.tags;
        let tag = tags.allocate();
        let waiter = tags.associate(tag);
        let pending = PendingCall { tags, tag };

        let request = Request::new(method, tag, arguments);
        let body = request.to_bytes()?;
        debug!(%method, tag, "sending rpc request");
        let raw = self.session.transport.send(body).await?;

        let response = decode(method, &raw).ok_or_else(|| {
            ClientError::client(format!("{method} response envelope did not decode"))
        })?;

        match response.tag {
            Some(echoed) if echoed == tag => {
                tags.resolve(tag, response);
            }
            echoed => {
                warn!(%method, tag, ?echoed, "dropping response with unmatched tag");
            }
        }
        drop(pending);

        let response = waiter.await.map_err(|_| {
            ClientError::client(format!("{method} response did not match request tag {tag}"))
        })?;
        debug!(%method, tag, result = %response.result, "received rpc response");

        if response.is_success() {
            Ok(response)
        } else {
            Err(ClientError::rpc(format!("{method} failed"), response.result))
        }
    }

    /// Fetch session configuration. An empty `fields` slice fetches every key.
    ///
    /// Returns `None` when the payload was absent or did not decode.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn session_get(&self, fields: &[SessionField]) -> ClientResult<Option<SessionInfo>> {
        let mut arguments = Map::new();
        if !fields.is_empty() {
            let keys: Vec<&str> = fields.iter().map(|field| field.wire_key()).collect();
            arguments.insert("fields".to_string(), Value::from(keys));
        }
        let response = self.call(RpcMethod::SessionGet, arguments).await?;
        Ok(match response.arguments {
            Some(ResponseArguments::Session(session)) => Some(session),
            _ => None,
        })
    }

    /// Change session configuration.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn session_set(
        &self,
        settings: &SessionSettings,
        policy: NullPolicy,
    ) -> ClientResult<()> {
        let arguments = to_arguments(settings, policy)?;
        self.call(RpcMethod::SessionSet, arguments).await?;
        Ok(())
    }

    /// Fetch transfer counters.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn session_stats(&self) -> ClientResult<Option<SessionStats>> {
        let response = self.call(RpcMethod::SessionStats, Map::new()).await?;
        Ok(match response.arguments {
            Some(ResponseArguments::SessionStats(stats)) => Some(stats),
            _ => None,
        })
    }

    /// Fetch torrents. An empty `fields` slice requests [`TorrentField::LIST`].
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_get(
        &self,
        ids: &TorrentIds,
        fields: &[TorrentField],
    ) -> ClientResult<Option<TorrentList>> {
        let fields = if fields.is_empty() {
            &TorrentField::LIST[..]
        } else {
            fields
        };
        let mut arguments = Map::new();
        arguments.insert(
            "fields".to_string(),
            Value::from(TorrentField::wire_keys(fields)),
        );
        ids.apply(&mut arguments);

        let response = self.call(RpcMethod::TorrentGet, arguments).await?;
        Ok(match response.arguments {
            Some(ResponseArguments::Torrents(list)) => Some(list),
            _ => None,
        })
    }

    /// Fetch torrents changed since the previous `recently-active` query, along
    /// with the ids removed in the meantime.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_get_recent(
        &self,
        fields: &[TorrentField],
    ) -> ClientResult<Option<TorrentList>> {
        self.torrent_get(&TorrentIds::RecentlyActive, fields).await
    }

    /// Add a torrent from a URL, magnet link, or metainfo.
    ///
    /// # Errors
    ///
    /// Returns a client error when neither `filename` nor `metainfo` is set, and
    /// otherwise see [`RpcClient::call`].
    pub async fn torrent_add(&self, add: &AddTorrent) -> ClientResult<Option<TorrentAddResult>> {
        if add.filename.is_none() && add.metainfo.is_none() {
            return Err(ClientError::client(
                "torrent-add needs either a filename or metainfo",
            ));
        }
        let arguments = to_arguments(add, NullPolicy::Omit)?;
        let response = self.call(RpcMethod::TorrentAdd, arguments).await?;
        Ok(match response.arguments {
            Some(ResponseArguments::TorrentAdded(added)) => Some(added),
            _ => None,
        })
    }

    /// Change per-torrent settings.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_set(
        &self,
        ids: &TorrentIds,
        args: &TorrentSetArgs,
        policy: NullPolicy,
    ) -> ClientResult<()> {
        let mut arguments = to_arguments(args, policy)?;
        ids.apply(&mut arguments);
        self.call(RpcMethod::TorrentSet, arguments).await?;
        Ok(())
    }

    /// Set or clear per-torrent speed limits; cleared limits are sent as null.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_set_limits(&self, ids: &TorrentIds, limits: SpeedLimits) -> ClientResult<()> {
        let mut arguments = to_arguments(&limits, NullPolicy::Keep)?;
        ids.apply(&mut arguments);
        self.call(RpcMethod::TorrentSet, arguments).await?;
        Ok(())
    }

    /// Remove torrents, optionally deleting downloaded data.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_remove(&self, ids: &TorrentIds, delete_local_data: bool) -> ClientResult<()> {
        let mut arguments = Map::new();
        ids.apply(&mut arguments);
        arguments.insert(
            "delete-local-data".to_string(),
            Value::Bool(delete_local_data),
        );
        self.call(RpcMethod::TorrentRemove, arguments).await?;
        Ok(())
    }

    /// Start torrents, respecting the queue.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_start(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.torrent_action(RpcMethod::TorrentStart, ids).await
    }

    /// Start torrents, bypassing the queue.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_start_now(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.torrent_action(RpcMethod::TorrentStartNow, ids).await
    }

    /// Stop torrents.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_stop(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.torrent_action(RpcMethod::TorrentStop, ids).await
    }

    /// Recheck local data.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_verify(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.torrent_action(RpcMethod::TorrentVerify, ids).await
    }

    /// Announce to trackers now.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn torrent_reannounce(&self, ids: &TorrentIds) -> ClientResult<()> {
        self.torrent_action(RpcMethod::TorrentReannounce, ids).await
    }

    /// Free space at `path` on the daemon host.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn free_space(&self, path: &str) -> ClientResult<Option<FreeSpace>> {
        let mut arguments = Map::new();
        arguments.insert("path".to_string(), Value::from(path));
        let response = self.call(RpcMethod::FreeSpace, arguments).await?;
        Ok(match response.arguments {
            Some(ResponseArguments::FreeSpace(free)) => Some(free),
            _ => None,
        })
    }

    async fn torrent_action(&self, method: RpcMethod, ids: &TorrentIds) -> ClientResult<()> {
        let mut arguments = Map::new();
        ids.apply(&mut arguments);
        self.call(method, arguments).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use remora_test_support::{FakeDaemon, fixtures};
    use tokio::task::JoinSet;

    use super::*;
    use crate::error::ErrorKind;

    type Reply = Box<dyn Fn(&Value) -> Value + Send + Sync>;

    /// Transport answering in memory and recording every request body.
    struct ScriptedTransport {
        reply: Reply,
        sent: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        fn echoing(reply: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(move |request| {
                    let tag = request["tag"].as_u64().unwrap_or_default();
                    fixtures::with_tag(reply(request), tag)
                }),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn raw(reply: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn last_sent(&self) -> Value {
            self.sent
                .lock()
                .expect("sent lock")
                .last()
                .cloned()
                .expect("a request was sent")
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn send(&self, body: Vec<u8>) -> ClientResult<Vec<u8>> {
            let request: Value = serde_json::from_slice(&body)?;
            self.sent.lock().expect("sent lock").push(request.clone());
            let reply = (self.reply)(&request);
            if reply.is_null() {
                return Ok(b"<html>not json</html>".to_vec());
            }
            Ok(serde_json::to_vec(&reply)?)
        }
    }

    #[tokio::test]
    async fn concurrent_calls_receive_their_own_tags() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| fixtures::success());
        let client = RpcClient::new(transport.clone());

        let mut calls = JoinSet::new();
        for _ in 0..16 {
            let client = client.clone();
            calls.spawn(async move { client.call(RpcMethod::TorrentStart, Map::new()).await });
        }
        let mut tags = Vec::new();
        while let Some(joined) = calls.join_next().await {
            let response = joined??;
            tags.push(response.tag.expect("tag echoed"));
        }
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), 16);
        assert_eq!(client.session().tags().pending(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_tag_fails_without_completing_anyone() {
        let transport = ScriptedTransport::raw(|request| {
            let tag = request["tag"].as_u64().unwrap_or_default();
            fixtures::with_tag(fixtures::success(), tag + 1_000)
        });
        let client = RpcClient::new(transport);

        let err = client
            .call(RpcMethod::TorrentStop, Map::new())
            .await
            .expect_err("mismatched tag must fail");
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(client.session().tags().pending(), 0);
    }

    #[tokio::test]
    async fn undecodable_envelope_is_a_client_error() {
        let client = RpcClient::new(ScriptedTransport::raw(|_| Value::Null));
        let err = client
            .session_stats()
            .await
            .expect_err("html body must fail");
        assert_eq!(err.kind(), ErrorKind::Client);
    }

    #[tokio::test]
    async fn failure_result_names_the_method() {
        let client = RpcClient::new(ScriptedTransport::echoing(|_| {
            fixtures::failure("invalid or corrupt torrent file")
        }));
        let err = client
            .torrent_add(&AddTorrent {
                metainfo: Some("bm90IGEgdG9ycmVudA==".into()),
                ..AddTorrent::default()
            })
            .await
            .expect_err("failure result must surface");
        assert_eq!(err.kind(), ErrorKind::Rpc);
        assert_eq!(err.header(), Some("torrent-add failed"));
        assert_eq!(err.message(), "invalid or corrupt torrent file");
    }

    #[tokio::test]
    async fn add_without_source_is_rejected_locally() {
        let transport = ScriptedTransport::echoing(|_| fixtures::success());
        let client = RpcClient::new(transport.clone());
        let err = client
            .torrent_add(&AddTorrent::default())
            .await
            .expect_err("empty add must fail");
        assert_eq!(err.kind(), ErrorKind::Client);
        assert!(transport.sent.lock().expect("sent lock").is_empty());
    }

    #[tokio::test]
    async fn torrent_get_sends_fields_and_ids() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| {
            fixtures::torrents(vec![fixtures::torrent(1, "aa", "one")])
        });
        let client = RpcClient::new(transport.clone());

        let list = client
            .torrent_get(&TorrentIds::hash("aa"), &[TorrentField::HashString, TorrentField::Name])
            .await?
            .expect("torrents payload");
        assert_eq!(list.torrents.len(), 1);

        let sent = transport.last_sent();
        assert_eq!(sent["method"], "torrent-get");
        assert_eq!(sent["arguments"]["fields"], serde_json::json!(["hashString", "name"]));
        assert_eq!(sent["arguments"]["ids"], serde_json::json!(["aa"]));
        Ok(())
    }

    #[tokio::test]
    async fn recent_query_uses_recently_active_selector() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| {
            fixtures::recent_torrents(vec![fixtures::torrent(2, "bb", "two")], &[7])
        });
        let client = RpcClient::new(transport.clone());

        let list = client.torrent_get_recent(&[]).await?.expect("payload");
        assert_eq!(list.removed, Some(vec![7]));
        let sent = transport.last_sent();
        assert_eq!(sent["arguments"]["ids"], "recently-active");
        assert_eq!(
            sent["arguments"]["fields"].as_array().map(Vec::len),
            Some(TorrentField::LIST.len())
        );
        Ok(())
    }

    #[tokio::test]
    async fn clearing_limits_sends_nulls() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| fixtures::success());
        let client = RpcClient::new(transport.clone());

        client
            .torrent_set_limits(&TorrentIds::Ids(vec![3]), SpeedLimits::new(None, Some(50)))
            .await?;
        let arguments = transport.last_sent()["arguments"].clone();
        assert!(arguments["downloadLimit"].is_null());
        assert!(arguments.get("downloadLimit").is_some());
        assert_eq!(arguments["downloadLimited"], false);
        assert_eq!(arguments["uploadLimit"], 50);
        assert_eq!(arguments["ids"], serde_json::json!([3]));
        Ok(())
    }

    #[tokio::test]
    async fn torrent_set_omits_unset_fields() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| fixtures::success());
        let client = RpcClient::new(transport.clone());

        let args = TorrentSetArgs {
            files_unwanted: Some(vec![1]),
            priority_high: Some(vec![0]),
            ..TorrentSetArgs::default()
        };
        client
            .torrent_set(&TorrentIds::All, &args, NullPolicy::Omit)
            .await?;
        let arguments = transport.last_sent()["arguments"].clone();
        let keys: Vec<_> = arguments
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        assert_eq!(keys, ["files-unwanted", "priority-high"]);
        Ok(())
    }

    #[tokio::test]
    async fn remove_sends_delete_flag() -> Result<()> {
        let transport = ScriptedTransport::echoing(|_| fixtures::success());
        let client = RpcClient::new(transport.clone());
        client.torrent_remove(&TorrentIds::hash("cc"), true).await?;
        let sent = transport.last_sent();
        assert_eq!(sent["method"], "torrent-remove");
        assert_eq!(sent["arguments"]["delete-local-data"], true);
        Ok(())
    }

    #[tokio::test]
    async fn free_space_decodes_size() -> Result<()> {
        let client = RpcClient::new(ScriptedTransport::echoing(|_| {
            fixtures::free_space("/srv", 1_234)
        }));
        let free = client.free_space("/srv").await?.expect("payload");
        assert_eq!(free.size_bytes, 1_234);
        Ok(())
    }

    #[tokio::test]
    async fn handshake_resends_once_then_reuses_token() -> Result<()> {
        let daemon = FakeDaemon::builder()
            .session_id("tok-abc")
            .respond_with(|_| fixtures::session_stats(100, 200))
            .spawn()
            .await?;
        let client = RpcClient::over_http(Url::parse(&daemon.url())?, TransportOptions::default())?;

        let stats = client.session_stats().await?.expect("stats payload");
        assert_eq!(stats.download_speed, Some(100));
        assert_eq!(daemon.rejections(), 1);
        assert_eq!(daemon.requests(), 2);

        client.session_stats().await?;
        assert_eq!(daemon.rejections(), 1);
        assert_eq!(daemon.requests(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn handshake_reads_token_from_rejection_body() -> Result<()> {
        let daemon = FakeDaemon::builder()
            .credentials("admin", "secret")
            .token_in_body_only()
            .spawn()
            .await?;
        let options = TransportOptions {
            credentials: Some(crate::transport::Credentials {
                username: "admin".into(),
                password: "secret".into(),
            }),
            ..TransportOptions::default()
        };
        let client = RpcClient::over_http(Url::parse(&daemon.url())?, options)?;

        client.torrent_verify(&TorrentIds::All).await?;
        assert_eq!(daemon.rejections(), 1);
        assert_eq!(daemon.received().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_rejection_is_an_authorization_error() -> Result<()> {
        let daemon = FakeDaemon::builder().reject_always().spawn().await?;
        let client = RpcClient::over_http(Url::parse(&daemon.url())?, TransportOptions::default())?;

        let err = client
            .torrent_start(&TorrentIds::All)
            .await
            .expect_err("daemon never accepts the session");
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(daemon.requests(), 2);
        assert_eq!(client.session().tags().pending(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn daemon_tag_skew_is_rejected() -> Result<()> {
        let daemon = FakeDaemon::builder().tag_offset(5).spawn().await?;
        let client = RpcClient::over_http(Url::parse(&daemon.url())?, TransportOptions::default())?;

        let err = client
            .torrent_stop(&TorrentIds::All)
            .await
            .expect_err("skewed tag must not match");
        assert_eq!(err.kind(), ErrorKind::Client);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_credentials_fail_with_authorization() -> Result<()> {
        let daemon = FakeDaemon::builder()
            .credentials("admin", "secret")
            .spawn()
            .await?;
        let client = RpcClient::over_http(Url::parse(&daemon.url())?, TransportOptions::default())?;
        let err = client.session_get(&[]).await.expect_err("no credentials");
        assert_eq!(err.kind(), ErrorKind::Authorization);
        Ok(())
    }
}
