//! Refresh coordination against a scripted in-memory transport.
//!
//! # Design
//! `Scripted` answers like the inventory backend: protected paths return 401
//! until a refresh succeeds, `/auth/*` bootstrap paths always return 401, and
//! `/auth/refresh` sleeps for a configurable delay so concurrent requests pile
//! up behind it. Every request is written to an event log, which lets the tests
//! check ordering (original → refresh settled → retry) as well as counts, and
//! every non-refresh request is kept whole so retries can be compared with the
//! original.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use inventory_core::{
    Body, ClientError, HttpMethod, HttpRequest, HttpResponse, MultipartForm, Params, RequestBody, RequestOptions,
    SessionClient, Transport,
};
use serde_json::{json, Value};

const BASE_URL: &str = "http://inventory.test";

#[derive(Default)]
struct Script {
    log: Mutex<Vec<String>>,
    requests: Mutex<Vec<HttpRequest>>,
    refresh_calls: AtomicUsize,
    refresh_delay_ms: AtomicU64,
    session_valid: AtomicBool,
    refresh_refused: AtomicBool,
    refresh_unreachable: AtomicBool,
    always_unauthorized: AtomicBool,
}

impl Script {
    fn record(&self, event: impl Into<String>) {
        self.log.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn set_delay(&self, millis: u64) {
        self.refresh_delay_ms.store(millis, Ordering::SeqCst);
    }
}

struct Scripted(Arc<Script>);

fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: serde_json::to_vec(&body).unwrap(),
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let script = &self.0;
        let path = request.url.strip_prefix(BASE_URL).unwrap().to_string();

        if path == "/auth/refresh" {
            script.refresh_calls.fetch_add(1, Ordering::SeqCst);
            script.record("refresh:start");
            let delay = script.refresh_delay_ms.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            script.record("refresh:done");

            if script.refresh_unreachable.load(Ordering::SeqCst) {
                return Err(ClientError::Network("connection reset".into()));
            }
            if script.refresh_refused.load(Ordering::SeqCst) {
                return Ok(json_response(401, json!({"ok": false, "error": "REFRESH_INVALID"})));
            }
            script.session_valid.store(true, Ordering::SeqCst);
            return Ok(json_response(200, json!({"ok": true})));
        }

        script.record(format!("{} {path}", request.method));
        script.requests.lock().unwrap().push(request.clone());
        if path.starts_with("/down") {
            return Err(ClientError::Network("connection refused".into()));
        }
        if path.starts_with("/export") {
            return Ok(HttpResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "text/csv".to_string())],
                body: b"id,nombre\n1,Martillo\n".to_vec(),
            });
        }
        if path.starts_with("/auth/login") || path.starts_with("/auth/register") {
            return Ok(json_response(401, json!({"ok": false, "error": "INVALID_CREDENTIALS"})));
        }
        if script.always_unauthorized.load(Ordering::SeqCst) || !script.session_valid.load(Ordering::SeqCst) {
            return Ok(json_response(401, json!({"ok": false, "error": "UNAUTHORIZED"})));
        }
        Ok(json_response(200, json!({"ok": true, "path": path})))
    }
}

fn setup() -> (Arc<Script>, SessionClient) {
    let script = Arc::new(Script::default());
    let client = SessionClient::new(BASE_URL, Arc::new(Scripted(Arc::clone(&script)))).unwrap();
    (script, client)
}

fn position(events: &[String], event: &str, nth: usize) -> usize {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| *e == event)
        .nth(nth)
        .map(|(i, _)| i)
        .unwrap_or_else(|| panic!("{event} #{nth} not in {events:?}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let (script, client) = setup();
    script.set_delay(50);

    let handles = (0..5).map(|i| {
        let client = client.clone();
        tokio::spawn(async move { client.get(&format!("/items/{i}"), Params::new()).await })
    });
    for result in join_all(handles).await {
        let envelope = result.unwrap().unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.status, 200);
    }

    assert_eq!(script.refresh_calls(), 1);
    let events = script.events();
    let refreshed = position(&events, "refresh:done", 0);
    for i in 0..5 {
        let event = format!("GET /items/{i}");
        assert_eq!(script.count(&event), 2, "{event} should be sent twice");
        assert!(position(&events, &event, 0) < refreshed);
        assert!(position(&events, &event, 1) > refreshed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_a_refused_refresh() {
    let (script, client) = setup();
    script.set_delay(50);
    script.refresh_refused.store(true, Ordering::SeqCst);

    let results = join_all((0..3).map(|i| {
        let client = client.clone();
        async move { client.get(&format!("/items/{i}"), Params::new()).await }
    }))
    .await;

    for envelope in results {
        let envelope = envelope.unwrap();
        assert_eq!(envelope.status, 401);
        assert_eq!(envelope.error_code(), Some("UNAUTHORIZED"));
    }
    assert_eq!(script.refresh_calls(), 1);
    for i in 0..3 {
        assert_eq!(script.count(&format!("GET /items/{i}")), 1);
    }
}

#[tokio::test]
async fn auth_bootstrap_paths_never_refresh() {
    let (script, client) = setup();
    let credentials = Body::json(&json!({"email": "ana@example.com", "password": "x"})).unwrap();

    let envelope = client.post("/auth/login", credentials.clone()).await.unwrap();
    assert_eq!(envelope.status, 401);
    let envelope = client.post("auth/register", credentials).await.unwrap();
    assert_eq!(envelope.status, 401);
    assert_eq!(script.refresh_calls(), 0);

    // A refused explicit refresh is final as well.
    script.refresh_refused.store(true, Ordering::SeqCst);
    let envelope = client.post("/auth/refresh", None).await.unwrap();
    assert_eq!(envelope.status, 401);
    assert_eq!(envelope.error_code(), Some("REFRESH_INVALID"));
    assert_eq!(script.refresh_calls(), 1);
}

#[tokio::test]
async fn retry_happens_at_most_once() {
    let (script, client) = setup();
    script.always_unauthorized.store(true, Ordering::SeqCst);

    let envelope = client.get("/items/1", Params::new()).await.unwrap();
    assert!(!envelope.ok);
    assert_eq!(envelope.status, 401);
    assert_eq!(script.refresh_calls(), 1);
    assert_eq!(script.count("GET /items/1"), 2);
}

#[tokio::test]
async fn refused_refresh_returns_original_401_and_resets() {
    let (script, client) = setup();
    script.refresh_refused.store(true, Ordering::SeqCst);

    let envelope = client.get("/items/1", Params::new()).await.unwrap();
    assert_eq!(envelope.status, 401);
    assert_eq!(envelope.error_code(), Some("UNAUTHORIZED"));
    assert_eq!(script.count("GET /items/1"), 1);
    assert_eq!(script.refresh_calls(), 1);

    client.get("/items/1", Params::new()).await.unwrap();
    assert_eq!(script.refresh_calls(), 2);
}

#[tokio::test]
async fn later_expiry_triggers_a_fresh_refresh() {
    let (script, client) = setup();

    assert!(client.get("/items/1", Params::new()).await.unwrap().ok);
    assert_eq!(script.refresh_calls(), 1);

    assert!(client.get("/items/2", Params::new()).await.unwrap().ok);
    assert_eq!(script.refresh_calls(), 1);

    script.session_valid.store(false, Ordering::SeqCst);
    assert!(client.get("/items/3", Params::new()).await.unwrap().ok);
    assert_eq!(script.refresh_calls(), 2);
}

#[tokio::test]
async fn unreachable_refresh_is_absorbed() {
    let (script, client) = setup();
    script.refresh_unreachable.store(true, Ordering::SeqCst);

    let envelope = client.get("/items/1", Params::new()).await.unwrap();
    assert_eq!(envelope.status, 401);
    assert_eq!(script.count("GET /items/1"), 1);

    script.refresh_unreachable.store(false, Ordering::SeqCst);
    let envelope = client.get("/items/1", Params::new()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(script.refresh_calls(), 2);
}

#[tokio::test]
async fn transport_failure_is_a_network_error() {
    let (script, client) = setup();

    let err = client.get("/down", Params::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(script.refresh_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_caller_does_not_cancel_refresh() {
    let (script, client) = setup();
    script.set_delay(150);

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.get("/items/a", Params::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.get("/items/b", Params::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    first.abort();

    let envelope = second.await.unwrap().unwrap();
    assert!(envelope.ok);
    assert_eq!(script.refresh_calls(), 1);
    assert_eq!(script.count("GET /items/b"), 2);
}

#[tokio::test]
async fn query_and_path_are_normalized() {
    let (script, client) = setup();
    script.session_valid.store(true, Ordering::SeqCst);

    let params = Params::new()
        .with("a", 1)
        .with("b", "")
        .with("c", None::<String>)
        .with("e", "x");
    let envelope = client.get("items", params).await.unwrap();
    assert_eq!(envelope.data.unwrap()["path"], "/items?a=1&e=x");
    assert_eq!(script.events(), vec!["GET /items?a=1&e=x".to_string()]);
}

#[tokio::test]
async fn non_json_answer_has_no_data() {
    let (script, client) = setup();
    script.session_valid.store(true, Ordering::SeqCst);

    let envelope = client.get("/export", Params::new()).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.data, None);
}

#[tokio::test]
async fn empty_path_fails_before_sending() {
    let (script, client) = setup();

    let err = client.get("", Params::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidPath(_)));
    assert!(script.events().is_empty());
}

#[tokio::test]
async fn retry_resends_json_body_and_headers() {
    let (script, client) = setup();

    let options = RequestOptions::new()
        .body(Body::json(&json!({"nombre": "Martillo", "stock": 3})).unwrap())
        .header("X-Request-Id", "abc-123");
    let envelope = client.request(HttpMethod::Post, "/productos", options).await.unwrap();
    assert!(envelope.ok);
    assert_eq!(script.refresh_calls(), 1);

    let requests = script.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(requests[1].header("x-request-id"), Some("abc-123"));
    assert_eq!(requests[1].header("content-type"), Some("application/json"));
    match &requests[1].body {
        Some(RequestBody::Json(text)) => {
            let value: Value = serde_json::from_str(text).unwrap();
            assert_eq!(value, json!({"nombre": "Martillo", "stock": 3}));
        }
        other => panic!("expected a JSON body, got {other:?}"),
    }
}

#[tokio::test]
async fn retry_resends_multipart_body() {
    let (script, client) = setup();

    let form = MultipartForm::new().file("avatar", "me.png", "image/png", vec![0x89, b'P', b'N', b'G']);
    let envelope = client.post("/usuarios/me/avatar", form.clone()).await.unwrap();
    assert!(envelope.ok);

    let requests = script.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(requests[1].body, Some(RequestBody::Multipart(form)));
    assert_eq!(requests[1].header("content-type"), None);
}
