use crate::types::ActionDescriptor;
use action_client::ActionResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// ErrorContext
// ---------------------------------------------------------------------------

pub struct ErrorContext<'a> {
    pub action: &'a ActionDescriptor,
    pub response: &'a ActionResponse,
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    RateLimited,
    InvalidRequest,
    Server,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Shown when the response body carries no message of its own.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "authentication required",
            ErrorKind::Forbidden => "permission denied",
            ErrorKind::NotFound => "action or resource not found",
            ErrorKind::Timeout => "the resource did not respond in time",
            ErrorKind::RateLimited => "too many requests, try again later",
            ErrorKind::InvalidRequest => "the request was rejected as invalid",
            ErrorKind::Server => "the server failed to run the action",
            ErrorKind::Unknown => "the action failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classification (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub action_id: String,
    pub display_name: String,
    pub rule: String,
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

pub struct Rule {
    pub id: &'static str,
    pub condition: fn(&ErrorContext) -> bool,
    pub kind: ErrorKind,
}

/// Status-based rules, most specific first.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "unauthorized",
            condition: |ctx| ctx.response.status == 401,
            kind: ErrorKind::Unauthorized,
        },
        Rule {
            id: "forbidden",
            condition: |ctx| ctx.response.status == 403,
            kind: ErrorKind::Forbidden,
        },
        Rule {
            id: "not_found",
            condition: |ctx| ctx.response.status == 404,
            kind: ErrorKind::NotFound,
        },
        Rule {
            id: "timeout",
            condition: |ctx| matches!(ctx.response.status, 408 | 504),
            kind: ErrorKind::Timeout,
        },
        Rule {
            id: "rate_limited",
            condition: |ctx| ctx.response.status == 429,
            kind: ErrorKind::RateLimited,
        },
        Rule {
            id: "invalid_request",
            condition: |ctx| matches!(ctx.response.status, 400 | 422),
            kind: ErrorKind::InvalidRequest,
        },
        Rule {
            id: "server",
            condition: |ctx| (500..600).contains(&ctx.response.status),
            kind: ErrorKind::Server,
        },
    ]
}

/// `errorMessage`, then `message`, from a JSON object body.
fn body_message(response: &ActionResponse) -> Option<&str> {
    ["errorMessage", "message"]
        .iter()
        .filter_map(|key| response.data.get(*key)?.as_str())
        .map(str::trim)
        .find(|m| !m.is_empty())
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Surfaces classified errors to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, classification: &Classification);
}

/// Emits each classification as a `warn` event.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, c: &Classification) {
        tracing::warn!(
            action_id = %c.action_id,
            kind = %c.kind,
            status = c.status,
            "{}",
            c.message
        );
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Classification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Classification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, c: &Classification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(c.clone());
    }
}

// ---------------------------------------------------------------------------
// ErrorClassifier
// ---------------------------------------------------------------------------

pub struct ErrorClassifier {
    rules: Vec<Rule>,
    notifier: Arc<dyn Notifier>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(default_rules(), Arc::new(TracingNotifier))
    }
}

impl ErrorClassifier {
    pub fn new(rules: Vec<Rule>, notifier: Arc<dyn Notifier>) -> Self {
        Self { rules, notifier }
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(default_rules(), notifier)
    }

    /// Classify a failed response and notify the user.
    pub fn classify(&self, action: &ActionDescriptor, response: &ActionResponse) -> Classification {
        let classification = self.evaluate(&ErrorContext { action, response });
        self.notifier.notify(&classification);
        classification
    }

    /// First matching rule wins; no match is `Unknown`.
    pub fn evaluate(&self, ctx: &ErrorContext) -> Classification {
        let (rule, kind) = self
            .rules
            .iter()
            .find(|r| (r.condition)(ctx))
            .map(|r| (r.id, r.kind))
            .unwrap_or(("fallback", ErrorKind::Unknown));

        let detail = body_message(ctx.response).unwrap_or(kind.default_message());
        Classification {
            action_id: ctx.action.action_id.clone(),
            display_name: ctx.action.display_name.clone(),
            rule: rule.to_string(),
            kind,
            status: ctx.response.status,
            message: format!("{}: {}", ctx.action.display_name, detail),
        }
    }
}
