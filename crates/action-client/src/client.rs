use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use uuid::Uuid;

use crate::loading::{LoadingCallback, LoadingGuard};
use crate::timing::{ResourceTimingEntry, ResourceTimings};
use crate::types::{ActionResponse, Outcome, RequestBody, RequestConfig};
use crate::{ActionClientError, Result};

/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// ─── ClientConfig ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix for relative request URLs, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    /// Transport timeout. Expiry settles the request as a crash.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout: Some(Duration::from_secs(30)),
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("lowcode/{}", env!("CARGO_PKG_VERSION"))
}

// ─── Handlers ─────────────────────────────────────────────────────────────

/// Callbacks for [`ActionClient::request`]. Every field is optional.
#[derive(Default)]
pub struct Handlers<'a> {
    pub on_success: Option<Box<dyn FnOnce(ActionResponse) + Send + 'a>>,
    pub on_failure: Option<Box<dyn FnOnce(ActionResponse) + Send + 'a>>,
    pub on_crash: Option<Box<dyn FnOnce(ActionClientError) + Send + 'a>>,
    pub on_loading: Option<LoadingCallback<'a>>,
}

impl<'a> Handlers<'a> {
    pub fn on_success(mut self, f: impl FnOnce(ActionResponse) + Send + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(ActionResponse) + Send + 'a) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    pub fn on_crash(mut self, f: impl FnOnce(ActionClientError) + Send + 'a) -> Self {
        self.on_crash = Some(Box::new(f));
        self
    }

    pub fn on_loading(mut self, f: impl FnMut(bool) + Send + 'a) -> Self {
        self.on_loading = Some(Box::new(f));
        self
    }
}

// ─── ActionClient ─────────────────────────────────────────────────────────

/// HTTP client for action runs.
///
/// Cheap to clone; clones share the connection pool and the timing log.
#[derive(Debug, Clone)]
pub struct ActionClient {
    http: reqwest::Client,
    config: ClientConfig,
    timings: ResourceTimings,
}

impl ActionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ActionClientError::InvalidBaseUrl(config.base_url));
        }
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
            timings: ResourceTimings::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub fn timings(&self) -> &ResourceTimings {
        &self.timings
    }

    /// Join a relative path onto the base URL; absolute URLs pass through.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    /// Issue the request and report how it settled.
    pub async fn send(&self, config: RequestConfig) -> Outcome {
        let request_id = Uuid::new_v4().to_string();
        let outcome = Outcome::from(self.execute(config, &request_id).await);
        match &outcome {
            Outcome::Success(r) => {
                tracing::debug!(request_id = %request_id, status = r.status, "request succeeded")
            }
            Outcome::Failure(r) => {
                tracing::debug!(request_id = %request_id, status = r.status, "request failed")
            }
            Outcome::Crash(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "request crashed")
            }
        }
        outcome
    }

    /// Callback form of [`send`](Self::send).
    ///
    /// Order is always `on_loading(true)`, then exactly one of
    /// `on_success` / `on_failure` / `on_crash`, then `on_loading(false)`.
    pub async fn request(&self, config: RequestConfig, handlers: Handlers<'_>) {
        let Handlers {
            on_success,
            on_failure,
            on_crash,
            on_loading,
        } = handlers;

        let loading = LoadingGuard::new(on_loading);
        match self.send(config).await {
            Outcome::Success(resp) => {
                if let Some(f) = on_success {
                    f(resp);
                }
            }
            Outcome::Failure(resp) => {
                if let Some(f) = on_failure {
                    f(resp);
                }
            }
            Outcome::Crash(err) => {
                if let Some(f) = on_crash {
                    f(err);
                }
            }
        }
        loading.finish();
    }

    async fn execute(&self, config: RequestConfig, request_id: &str) -> Result<ActionResponse> {
        let RequestConfig {
            url,
            method,
            body,
            headers,
            transform_request,
            transform_response,
        } = config;

        let url = self.resolve_url(&url);
        let body = RequestConfig::apply_request_transforms(&transform_request, body)?;

        let mut req = self
            .http
            .request(method.into(), &url)
            .header(REQUEST_ID_HEADER, request_id);
        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(text) = body.into_text()? {
            req = req.header(CONTENT_TYPE, "application/json").body(text);
        }

        tracing::debug!(%method, url = %url, request_id, "sending request");
        let start_time = Utc::now();
        let started = Instant::now();

        let resp = req.send().await.map_err(|e| self.map_transport(e))?;
        let status = resp.status().as_u16();
        let resp_headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let bytes = resp.bytes().await.map_err(|e| self.map_transport(e))?;

        self.timings.record(ResourceTimingEntry {
            name: url.clone(),
            request_id: request_id.to_string(),
            start_time,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            response_status: status,
            transfer_size: bytes.len() as u64,
        });

        let data = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|source| ActionClientError::MalformedResponse { status, source })?
        };

        let response = ActionResponse {
            status,
            headers: resp_headers,
            data,
            request_id: request_id.to_string(),
            url,
        };
        Ok(transform_response
            .iter()
            .fold(response, |resp, transform| transform(resp)))
    }

    fn map_transport(&self, e: reqwest::Error) -> ActionClientError {
        match self.config.timeout {
            Some(timeout) if e.is_timeout() => ActionClientError::Timeout(timeout),
            _ => ActionClientError::Transport(e),
        }
    }
}

/// Serialize a JSON body into text. Usable as the last request transform.
pub fn serialize_body(body: RequestBody) -> Result<RequestBody> {
    Ok(match body.into_text()? {
        Some(text) => RequestBody::Text(text),
        None => RequestBody::Empty,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn client(base_url: &str) -> ActionClient {
        ActionClient::new(ClientConfig {
            base_url: base_url.to_string(),
            timeout: Some(Duration::from_millis(500)),
            user_agent: "test-agent/1.0".to_string(),
        })
        .unwrap()
    }

    /// Accepts a single connection, reads a little, and hangs up.
    async fn hang_up_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = sock.read(&mut buf).await;
            }
        });
        format!("http://{addr}")
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, e: impl Into<String>) {
            self.events.lock().unwrap().push(e.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    fn handlers(rec: &Arc<Recorder>) -> Handlers<'static> {
        let (s, f, c, l) = (rec.clone(), rec.clone(), rec.clone(), rec.clone());
        Handlers::default()
            .on_success(move |r| s.push(format!("success:{}", r.status)))
            .on_failure(move |r| f.push(format!("failure:{}", r.status)))
            .on_crash(move |_| c.push("crash"))
            .on_loading(move |b| l.push(format!("loading:{b}")))
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ActionClient::new(ClientConfig {
            base_url: "localhost:8000".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ActionClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn resolve_url_joins_relative_paths() {
        let c = client("http://example.test/api/v1/");
        assert_eq!(
            c.resolve_url("/apps/a/actions/b/run"),
            "http://example.test/api/v1/apps/a/actions/b/run"
        );
        assert_eq!(c.resolve_url("https://other.test/x"), "https://other.test/x");
    }

    #[tokio::test]
    async fn success_fires_loading_around_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/run")
            .match_header("content-type", "application/json")
            .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
            .match_header("user-agent", "test-agent/1.0")
            .match_body(Matcher::Json(json!({ "a": 1 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"foo":"bar"}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        let rec = Arc::new(Recorder::default());
        c.request(
            RequestConfig::new(Method::Post, "/run").json(json!({ "a": 1 })),
            handlers(&rec),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(
            rec.events(),
            vec!["loading:true", "success:200", "loading:false"]
        );
    }

    #[tokio::test]
    async fn non_2xx_with_json_body_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/run")
            .with_status(500)
            .with_body(r#"{"message":"bad"}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        match c.send(RequestConfig::new(Method::Post, "/run")).await {
            Outcome::Failure(resp) => {
                assert_eq!(resp.status, 500);
                assert_eq!(resp.data, json!({ "message": "bad" }));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hang_up_is_crash() {
        let base = hang_up_server().await;
        let c = client(&base);
        let rec = Arc::new(Recorder::default());
        c.request(RequestConfig::new(Method::Post, "/run"), handlers(&rec))
            .await;
        assert_eq!(rec.events(), vec!["loading:true", "crash", "loading:false"]);
        assert!(c.timings().is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_crash() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(&format!("http://{addr}"));
        let outcome = c.send(RequestConfig::new(Method::Get, "/run")).await;
        assert!(matches!(outcome, Outcome::Crash(ActionClientError::Transport(_))));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((sock, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(3)).await;
                drop(sock);
            }
        });

        let c = client(&format!("http://{addr}"));
        let outcome = c.send(RequestConfig::new(Method::Get, "/slow")).await;
        assert!(matches!(outcome, Outcome::Crash(ActionClientError::Timeout(_))));
    }

    #[tokio::test]
    async fn malformed_body_is_crash() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/run")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let c = client(&server.url());
        let outcome = c.send(RequestConfig::new(Method::Get, "/run")).await;
        assert!(matches!(
            outcome,
            Outcome::Crash(ActionClientError::MalformedResponse { status: 200, .. })
        ));
    }

    #[tokio::test]
    async fn empty_body_is_null_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/thing")
            .with_status(204)
            .create_async()
            .await;

        let c = client(&server.url());
        let Outcome::Success(resp) = c.send(RequestConfig::new(Method::Delete, "/thing")).await
        else {
            panic!("expected success")
        };
        assert_eq!(resp.data, Value::Null);
    }

    #[tokio::test]
    async fn failing_transform_crashes_without_sending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/run").expect(0).create_async().await;

        let c = client(&server.url());
        let outcome = c
            .send(
                RequestConfig::new(Method::Post, "/run")
                    .transform_request(|_| Err(ActionClientError::Transform("nope".into()))),
            )
            .await;
        assert!(matches!(outcome, Outcome::Crash(ActionClientError::Transform(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn response_transforms_apply_before_dispatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/run")
            .with_status(200)
            .with_body(r#"{"n":1}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        let outcome = c
            .send(RequestConfig::new(Method::Get, "/run").transform_response(|mut r| {
                r.data = json!({ "wrapped": r.data });
                r
            }))
            .await;
        let Outcome::Success(resp) = outcome else {
            panic!("expected success")
        };
        assert_eq!(resp.data, json!({ "wrapped": { "n": 1 } }));
    }

    #[tokio::test]
    async fn completed_requests_are_timed_by_url_and_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/run")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(2)
            .create_async()
            .await;

        let c = client(&server.url());
        let url = c.resolve_url("/run");
        let first = c.send(RequestConfig::new(Method::Post, "/run")).await;
        let second = c.send(RequestConfig::new(Method::Post, "/run")).await;

        let entries = c.timings().entries_by_name(&url);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_id, first.response().unwrap().request_id);
        assert_eq!(entries[1].request_id, second.response().unwrap().request_id);
        assert_eq!(entries[1].transfer_size, 11);
        assert!(entries.iter().all(|e| e.response_status == 200));
    }

    #[test]
    fn serialize_body_turns_json_into_text() {
        assert_eq!(
            serialize_body(RequestBody::Json(json!([1, 2]))).unwrap(),
            RequestBody::Text("[1,2]".into())
        );
        assert_eq!(serialize_body(RequestBody::Empty).unwrap(), RequestBody::Empty);
    }
}
