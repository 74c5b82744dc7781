use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionClientError, Result};

// ─── Method ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

// ─── RequestBody ──────────────────────────────────────────────────────────

/// Request payload as it moves through the transform chain.
///
/// Transforms may change the representation, typically the last "shape"
/// transform serializes `Json` into `Text`. Whatever is left at the end of
/// the chain is sent as `application/json`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
}

impl RequestBody {
    /// Serialize into the bytes that go on the wire (`None` for no body).
    pub fn into_text(self) -> Result<Option<String>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Json(v) => Ok(Some(serde_json::to_string(&v)?)),
            RequestBody::Text(s) => Ok(Some(s)),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Applied to the request body, in order, before the request is sent.
pub type RequestTransform = Arc<dyn Fn(RequestBody) -> Result<RequestBody> + Send + Sync>;

/// Applied to a received response before it is classified as success/failure.
pub type ResponseTransform = Arc<dyn Fn(ActionResponse) -> ActionResponse + Send + Sync>;

// ─── RequestConfig ────────────────────────────────────────────────────────

/// A single request: target, method, body and the transform hooks.
///
/// `url` may be absolute or relative to the client's base URL.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    pub transform_request: Vec<RequestTransform>,
    pub transform_response: Vec<ResponseTransform>,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            ..Default::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn transform_request<F>(mut self, f: F) -> Self
    where
        F: Fn(RequestBody) -> Result<RequestBody> + Send + Sync + 'static,
    {
        self.transform_request.push(Arc::new(f));
        self
    }

    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ActionResponse) -> ActionResponse + Send + Sync + 'static,
    {
        self.transform_response.push(Arc::new(f));
        self
    }

    /// Run the request transforms over the body, in declaration order.
    pub(crate) fn apply_request_transforms(
        transforms: &[RequestTransform],
        body: RequestBody,
    ) -> Result<RequestBody> {
        transforms.iter().try_fold(body, |body, t| t(body))
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("transform_request", &self.transform_request.len())
            .field("transform_response", &self.transform_response.len())
            .finish()
    }
}

// ─── ActionResponse ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body; `Null` when the server sent no body.
    pub data: Value,
    /// Correlation id sent as `X-Request-Id`.
    pub request_id: String,
    pub url: String,
}

impl ActionResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ─── Outcome ──────────────────────────────────────────────────────────────

/// How a request settled. Exactly one variant per request.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx response.
    Success(ActionResponse),
    /// Non-2xx response carrying a JSON body.
    Failure(ActionResponse),
    /// No usable response (transport error, timeout, malformed body, or a
    /// failing request transform).
    Crash(ActionClientError),
}

impl Outcome {
    pub fn response(&self) -> Option<&ActionResponse> {
        match self {
            Outcome::Success(r) | Outcome::Failure(r) => Some(r),
            Outcome::Crash(_) => None,
        }
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, Outcome::Crash(_))
    }
}

impl From<Result<ActionResponse>> for Outcome {
    fn from(r: std::result::Result<ActionResponse, ActionClientError>) -> Self {
        match r {
            Ok(resp) if resp.is_success() => Outcome::Success(resp),
            Ok(resp) => Outcome::Failure(resp),
            Err(e) => Outcome::Crash(e),
        }
    }
}
