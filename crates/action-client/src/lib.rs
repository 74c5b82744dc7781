//! `action-client`: HTTP transport for running builder actions.
//!
//! # Architecture
//!
//! ```text
//! RequestConfig          url · method · body · headers
//!     │                  transform_request[]  (body → body, in order)
//!     ▼
//! ActionClient::send     adds X-Request-Id, sends, reads the body
//!     │                  records a ResourceTimingEntry per response
//!     ▼
//! transform_response[]   (response → response, in order)
//!     │
//!     ▼
//! Outcome                Success (2xx) · Failure (non-2xx) · Crash (no response)
//! ```
//!
//! [`ActionClient::request`] wraps `send` in the callback contract
//! (`on_loading(true)` → one outcome callback → `on_loading(false)`).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use action_client::{ActionClient, ClientConfig, Method, Outcome, RequestConfig};
//! use serde_json::json;
//!
//! let client = ActionClient::new(ClientConfig::default())?;
//! let cfg = RequestConfig::new(Method::Post, "/apps/app1/actions/a1/run")
//!     .json(json!({ "resourceId": "r1" }));
//! match client.send(cfg).await {
//!     Outcome::Success(resp) => println!("{}", resp.data),
//!     Outcome::Failure(resp) => eprintln!("server said {}", resp.status),
//!     Outcome::Crash(err) => eprintln!("no response: {err}"),
//! }
//! ```

pub mod client;
pub mod error;
pub mod loading;
pub mod timing;
pub mod types;

pub use client::{
    default_user_agent, serialize_body, ActionClient, ClientConfig, Handlers, REQUEST_ID_HEADER,
};
pub use error::ActionClientError;
pub use loading::{LoadingCallback, LoadingGuard};
pub use timing::{ResourceTimingEntry, ResourceTimings};
pub use types::{
    ActionResponse, Method, Outcome, RequestBody, RequestConfig, RequestTransform,
    ResponseTransform,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ActionClientError>;
