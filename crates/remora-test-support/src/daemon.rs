//! In-process fake daemon speaking the RPC's HTTP framing.
//!
//! Enforces basic auth and the session-token handshake, echoes request tags,
//! and records every request body so tests can inspect what was sent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::{Engine as _, engine::general_purpose};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures;

/// Path the fake daemon serves the RPC on.
pub const RPC_PATH: &str = "/transmission/rpc";

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

type Responder = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Builder for [`FakeDaemon`].
pub struct FakeDaemonBuilder {
    credentials: Option<(String, String)>,
    session_id: String,
    responder: Responder,
    tag_offset: u64,
    token_in_body_only: bool,
    reject_always: bool,
}

impl Default for FakeDaemonBuilder {
    fn default() -> Self {
        Self {
            credentials: None,
            session_id: "fake-session-1".to_string(),
            responder: Arc::new(|_| fixtures::success()),
            tag_offset: 0,
            token_in_body_only: false,
            reject_always: false,
        }
    }
}

impl FakeDaemonBuilder {
    /// Require basic auth with these credentials.
    #[must_use]
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Session token the daemon issues and accepts.
    #[must_use]
    pub fn session_id(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    /// Produce the response envelope (without `tag`) for a request body.
    #[must_use]
    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    /// Echo `tag + offset` instead of the request tag.
    #[must_use]
    pub fn tag_offset(mut self, offset: u64) -> Self {
        self.tag_offset = offset;
        self
    }

    /// Issue the token only inside the rejection body, not as a header.
    #[must_use]
    pub fn token_in_body_only(mut self) -> Self {
        self.token_in_body_only = true;
        self
    }

    /// Reject every request with `409`, issuing a new token each time.
    #[must_use]
    pub fn reject_always(mut self) -> Self {
        self.reject_always = true;
        self
    }

    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(self) -> Result<FakeDaemon> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind fake daemon listener")?;
        let addr = listener
            .local_addr()
            .context("fake daemon listener has no local address")?;

        let state = Arc::new(DaemonState {
            credentials: self.credentials,
            session_id: self.session_id,
            responder: self.responder,
            tag_offset: self.tag_offset,
            token_in_body_only: self.token_in_body_only,
            reject_always: self.reject_always,
            requests: AtomicUsize::new(0),
            rejections: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(RPC_PATH, post(handle_rpc))
            .with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(FakeDaemon { addr, state, task })
    }
}

/// Running fake daemon; stops serving when dropped.
pub struct FakeDaemon {
    addr: SocketAddr,
    state: Arc<DaemonState>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    /// Start configuring a daemon.
    #[must_use]
    pub fn builder() -> FakeDaemonBuilder {
        FakeDaemonBuilder::default()
    }

    /// Daemon with default behaviour: no auth, handshake enforced, `success` replies.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> Result<Self> {
        Self::builder().spawn().await
    }

    /// Full RPC endpoint URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}{RPC_PATH}", self.addr)
    }

    /// Address the daemon listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests received, rejected ones included.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Requests answered with `409 Conflict`.
    #[must_use]
    pub fn rejections(&self) -> usize {
        self.state.rejections.load(Ordering::SeqCst)
    }

    /// Bodies of the requests that passed the handshake, in arrival order.
    #[must_use]
    pub fn received(&self) -> Vec<Value> {
        self.state
            .received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct DaemonState {
    credentials: Option<(String, String)>,
    session_id: String,
    responder: Responder,
    tag_offset: u64,
    token_in_body_only: bool,
    reject_always: bool,
    requests: AtomicUsize,
    rejections: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl DaemonState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some((username, password)) = &self.credentials else {
            return true;
        };
        let expected = general_purpose::STANDARD.encode(format!("{username}:{password}"));
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "))
            .is_some_and(|encoded| encoded == expected)
    }

    fn reject(&self) -> Response {
        let count = self.rejections.fetch_add(1, Ordering::SeqCst) + 1;
        let token = if self.reject_always {
            format!("{}-{count}", self.session_id)
        } else {
            self.session_id.clone()
        };
        let body = Html(format!(
            "<h1>409: Conflict</h1><p>Your request had an invalid session-id header.</p>\
             <p><code>{SESSION_HEADER}: {token}</code></p>"
        ));
        if self.token_in_body_only {
            (StatusCode::CONFLICT, body).into_response()
        } else {
            (StatusCode::CONFLICT, [(SESSION_HEADER, token)], body).into_response()
        }
    }
}

async fn handle_rpc(
    State(state): State<Arc<DaemonState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized User").into_response();
    }

    let presented = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok());
    if state.reject_always || presented != Some(state.session_id.as_str()) {
        return state.reject();
    }

    let Ok(request) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, "malformed request").into_response();
    };
    state
        .received
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request.clone());

    let mut reply = (state.responder)(&request);
    if let Some(tag) = request.get("tag").and_then(Value::as_u64) {
        reply = fixtures::with_tag(reply, tag + state.tag_offset);
    }
    (
        StatusCode::OK,
        [(SESSION_HEADER, state.session_id.clone())],
        Json(reply),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port() -> Result<()> {
        let daemon = FakeDaemon::start().await?;
        assert_ne!(daemon.addr().port(), 0);
        assert!(daemon.url().ends_with(RPC_PATH));
        assert_eq!(daemon.requests(), 0);
        Ok(())
    }

    #[test]
    fn credentials_checked_against_basic_header() {
        let state = DaemonState {
            credentials: Some(("admin".into(), "secret".into())),
            session_id: "s".into(),
            responder: Arc::new(|_| fixtures::success()),
            tag_offset: 0,
            token_in_body_only: false,
            reject_always: false,
            requests: AtomicUsize::new(0),
            rejections: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        };
        let mut headers = HeaderMap::new();
        assert!(!state.authorized(&headers));
        headers.insert(
            header::AUTHORIZATION,
            "Basic YWRtaW46c2VjcmV0".parse().expect("header value"),
        );
        assert!(state.authorized(&headers));
    }
}
