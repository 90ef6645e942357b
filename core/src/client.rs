//! Sessioned HTTP client for the inventory API.
//!
//! # Design
//! `SessionClient` holds the base URL, a shared `Transport` and the refresh
//! slot. Cloning it is cheap and every clone shares the same refresh slot, so
//! one client built at startup can be handed to every API wrapper.
//!
//! A 401 on any path outside the auth bootstrap endpoints starts (or joins)
//! a refresh, then resends the original request once if the refresh
//! succeeded. The refresh runs on its own Tokio task so a caller that stops
//! waiting cannot cancel it for the others. "Start or join" and "clear on
//! settle" both happen under the same mutex, and the task clears the slot
//! before it publishes the outcome, so no caller can join a refresh that has
//! already been discarded.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, MultipartForm, RequestBody};
use crate::query::Params;
use crate::transport::Transport;

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Paths whose 401 is final. Matched by prefix on the normalized path.
pub const AUTH_BOOTSTRAP_PATHS: [&str; 3] = [REFRESH_PATH, "/auth/login", "/auth/register"];

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request payload before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

impl From<MultipartForm> for Body {
    fn from(form: MultipartForm) -> Self {
        Body::Multipart(form)
    }
}

impl From<MultipartForm> for Option<Body> {
    fn from(form: MultipartForm) -> Self {
        Some(Body::Multipart(form))
    }
}

/// Optional parts of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub params: Params,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<Option<Body>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

type PendingRefresh = Shared<BoxFuture<'static, Envelope>>;

#[derive(Default)]
struct RefreshSlot {
    in_flight: Option<PendingRefresh>,
}

/// Clears the refresh slot when the refresh task ends, however it ends.
/// Never dropped while the slot is locked.
struct SettleGuard(Arc<Mutex<RefreshSlot>>);

impl Drop for SettleGuard {
    fn drop(&mut self) {
        lock(&self.0).in_flight = None;
    }
}

fn lock(slot: &Mutex<RefreshSlot>) -> MutexGuard<'_, RefreshSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// HTTP client that attaches the session implicitly and recovers from an
/// expired access token with one coordinated refresh.
///
/// Must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct SessionClient {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
    refresh: Arc<Mutex<RefreshSlot>>,
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Fails with `ClientError::Config` when `base_url` is empty once trailing
    /// slashes are removed.
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::Config("API_BASE_URL_REQUIRED".to_string()));
        }
        Ok(Self {
            base_url: Arc::from(base_url),
            transport,
            refresh: Arc::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL and normalized path (exactly one leading slash).
    pub fn build_url(&self, path: &str) -> Result<(String, String), ClientError> {
        if path.is_empty() {
            return Err(ClientError::InvalidPath(path.to_string()));
        }
        let normalized = format!("/{}", path.trim_start_matches('/'));
        Ok((format!("{}{normalized}", self.base_url), normalized))
    }

    pub async fn get(&self, path: &str, params: Params) -> Result<Envelope, ClientError> {
        self.request(HttpMethod::Get, path, RequestOptions::new().params(params)).await
    }

    pub async fn delete(&self, path: &str, params: Params) -> Result<Envelope, ClientError> {
        self.request(HttpMethod::Delete, path, RequestOptions::new().params(params)).await
    }

    pub async fn post(&self, path: &str, body: impl Into<Option<Body>>) -> Result<Envelope, ClientError> {
        self.request(HttpMethod::Post, path, RequestOptions::new().body(body)).await
    }

    pub async fn put(&self, path: &str, body: impl Into<Option<Body>>) -> Result<Envelope, ClientError> {
        self.request(HttpMethod::Put, path, RequestOptions::new().body(body)).await
    }

    pub async fn patch(&self, path: &str, body: impl Into<Option<Body>>) -> Result<Envelope, ClientError> {
        self.request(HttpMethod::Patch, path, RequestOptions::new().body(body)).await
    }

    /// Send a request, refreshing the session and retrying once on a 401.
    ///
    /// A final 401 is returned as an envelope, not an error: the caller decides
    /// what "unauthenticated" means for it.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<Envelope, ClientError> {
        let (mut url, normalized) = self.build_url(path)?;
        if let Some(query) = options.params.encode() {
            url.push('?');
            url.push_str(&query);
        }
        let request = build_request(method, url, options.body, options.headers)?;

        debug!(%method, path = %normalized, "sending request");
        let mut response = self.transport.send(request.clone()).await?;

        if response.status == 401 && !is_auth_bootstrap(&normalized) {
            debug!(path = %normalized, "access rejected, refreshing session");
            let refreshed = self.refresh_access_token().await;
            if refreshed.ok {
                debug!(%method, path = %normalized, "retrying after refresh");
                response = self.transport.send(request).await?;
            }
        }

        Ok(Envelope::from_response(&response))
    }

    /// Start a refresh, or join the one already in flight.
    async fn refresh_access_token(&self) -> Envelope {
        let (pending, settle) = {
            let mut slot = lock(&self.refresh);
            if let Some(pending) = &slot.in_flight {
                debug!("joining in-flight refresh");
                (pending.clone(), None)
            } else {
                let (tx, rx) = oneshot::channel();
                let pending = rx
                    .map(|outcome| outcome.unwrap_or_else(|_| Envelope::unreachable()))
                    .boxed()
                    .shared();
                slot.in_flight = Some(pending.clone());
                (pending, Some(tx))
            }
        };
        if let Some(settle) = settle {
            self.spawn_refresh(settle);
        }
        pending.await
    }

    /// Runs `POST /auth/refresh` on its own task. The slot is cleared before
    /// the outcome is published to the waiters.
    fn spawn_refresh(&self, settle: oneshot::Sender<Envelope>) {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{REFRESH_PATH}", self.base_url),
            headers: vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: None,
        };
        let transport = Arc::clone(&self.transport);
        let guard = SettleGuard(Arc::clone(&self.refresh));

        info!("refreshing access token");
        tokio::spawn(async move {
            let outcome = match transport.send(request).await {
                Ok(response) => {
                    let envelope = Envelope::from_response(&response);
                    if envelope.ok {
                        info!(status = envelope.status, "access token refreshed");
                    } else {
                        warn!(status = envelope.status, "refresh endpoint refused the session");
                    }
                    envelope
                }
                Err(err) => {
                    warn!(error = %err, "refresh request failed to reach the backend");
                    Envelope::unreachable()
                }
            };
            drop(guard);
            let _ = settle.send(outcome);
        });
    }
}

fn is_auth_bootstrap(normalized: &str) -> bool {
    AUTH_BOOTSTRAP_PATHS
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

fn build_request(
    method: HttpMethod,
    url: String,
    body: Option<Body>,
    overrides: Vec<(String, String)>,
) -> Result<HttpRequest, ClientError> {
    let mut headers = Vec::new();
    let body = match body {
        Some(Body::Multipart(form)) => Some(RequestBody::Multipart(form)),
        Some(Body::Json(value)) => {
            headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
            let text = serde_json::to_string(&value).map_err(|e| ClientError::Serialization(e.to_string()))?;
            Some(RequestBody::Json(text))
        }
        None => {
            headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
            None
        }
    };
    for (name, value) in overrides {
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        headers.push((name, value));
    }
    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}
