use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong before a structured response is in hand.
///
/// A non-2xx response is *not* an error at this layer: it is reported as
/// [`crate::Outcome::Failure`]. Any variant of this enum means the request
/// crashed and no usable response exists.
#[derive(Debug, Error)]
pub enum ActionClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response body (status {status}): {source}")]
    MalformedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request transform failed: {0}")]
    Transform(String),

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}
