//! HTTP transport with the daemon's session-token handshake.
//!
//! The daemon rejects a request carrying a missing or stale session token with
//! `409 Conflict` and hands out the current token in that rejection. The
//! transport caches the token, retries a rejected request exactly once with the
//! fresh token, and gives up with an authorization error on a second rejection.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Header carrying the daemon session token.
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends encoded requests and returns raw response bodies.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Deliver `body` to the daemon and return the raw response payload.
    async fn send(&self, body: Vec<u8>) -> ClientResult<Vec<u8>>;
}

/// Basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password; may be empty.
    pub password: String,
}

/// Options for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Deadline for a single HTTP exchange.
    pub timeout: Duration,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }
}

/// `reqwest`-backed transport holding the cached session token.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
    session_token: RwLock<Option<String>>,
}

enum Exchange {
    Accepted(Vec<u8>),
    Rejected { token: Option<String> },
}

impl HttpTransport {
    /// Build a transport for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a client error if the HTTP client cannot be constructed.
    pub fn new(endpoint: Url, options: TransportOptions) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|err| ClientError::client_with("failed to build HTTP client", err))?;

        Ok(Self {
            client,
            endpoint,
            credentials: options.credentials,
            session_token: RwLock::new(None),
        })
    }

    /// Currently cached session token.
    pub async fn session_token(&self) -> Option<String> {
        self.session_token.read().await.clone()
    }

    async fn exchange(&self, body: &[u8], token: Option<&str>) -> ClientResult<Exchange> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(token) = token {
            request = request.header(SESSION_HEADER, token);
        }
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await.map_err(map_http_error)?;
        let status = response.status();
        let header_token = token_from_headers(response.headers());

        match status {
            StatusCode::CONFLICT => {
                let text = response.text().await.map_err(map_http_error)?;
                let token = header_token.or_else(|| token_from_body(&text));
                Ok(Exchange::Rejected { token })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::authorization(
                format!("daemon refused credentials ({status})"),
            )),
            status if status.is_success() => {
                if let Some(fresh) = header_token {
                    self.remember(token, fresh).await;
                }
                let bytes = response.bytes().await.map_err(map_http_error)?;
                Ok(Exchange::Accepted(bytes.to_vec()))
            }
            status => {
                let text = response.text().await.map_err(map_http_error)?;
                Err(ClientError::rpc(status.to_string(), text.trim().to_string()))
            }
        }
    }

    /// Store `fresh` unless another caller already replaced `stale`.
    async fn remember(&self, stale: Option<&str>, fresh: String) {
        let mut guard = self.session_token.write().await;
        if guard.as_deref() == stale || guard.is_none() {
            debug!("cached new daemon session token");
            *guard = Some(fresh);
        }
    }

    async fn invalidate(&self) {
        *self.session_token.write().await = None;
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, body: Vec<u8>) -> ClientResult<Vec<u8>> {
        let cached = self.session_token().await;

        let fresh = match self.exchange(&body, cached.as_deref()).await? {
            Exchange::Accepted(bytes) => return Ok(bytes),
            Exchange::Rejected { token: Some(fresh) } => fresh,
            Exchange::Rejected { token: None } => {
                self.invalidate().await;
                return Err(ClientError::authorization(
                    "daemon rejected the session without issuing a token",
                ));
            }
        };

        debug!("session token rejected; retrying with handshake token");
        self.remember(cached.as_deref(), fresh.clone()).await;

        match self.exchange(&body, Some(&fresh)).await? {
            Exchange::Accepted(bytes) => Ok(bytes),
            Exchange::Rejected { .. } => {
                warn!("daemon rejected the refreshed session token");
                self.invalidate().await;
                Err(ClientError::authorization(
                    "daemon rejected the session token twice",
                ))
            }
        }
    }
}

/// Classify a failure while sending a request or reading its response body.
fn map_http_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            message: "request deadline elapsed".to_string(),
            source: Some(Box::new(err)),
        }
    } else if err.is_connect() {
        ClientError::Timeout {
            message: "daemon unreachable".to_string(),
            source: Some(Box::new(err)),
        }
    } else if err.is_body() || err.is_decode() {
        ClientError::rpc("malformed response", err.to_string())
    } else {
        ClientError::client_with("http request failed", err)
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Pull the token out of a rejection body such as
/// `<code>X-Transmission-Session-Id: abc123</code>`.
fn token_from_body(body: &str) -> Option<String> {
    let marker = format!("{SESSION_HEADER}:");
    let start = body.find(&marker)? + marker.len();
    let token: String = body[start..]
        .trim_start()
        .chars()
        .take_while(|ch| !ch.is_whitespace() && *ch != '<')
        .collect();
    (!token.is_empty()).then_some(token)
}
