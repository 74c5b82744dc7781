//! Action execution: run one action and propagate its result into shared
//! state.
//!
//! ```text
//! Idle ─▶ Preparing ─┬─▶ TransformerPath ──────────────────────┐
//!                    │                                          ▼
//!                    └─▶ NetworkPath ─▶ Success | Failure | Crash ─▶ Settled
//! ```
//!
//! Preparing starts the `prepareQuery` timer for the action id. On the
//! network path the request transforms append the `User-Agent` header (REST
//! API actions only), serialize the body, and stop that timer.

use crate::classifier::{Classification, ErrorClassifier};
use crate::performance::{resource_metrics, resource_metrics_for, PerformanceTracker};
use crate::store::ActionStore;
use crate::types::{empty_object, ActionDescriptor, ActionResult};
use action_client::{
    serialize_body, ActionClient, ActionClientError, ActionResponse, LoadingCallback,
    LoadingGuard, Method, Outcome, RequestBody, RequestConfig,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

type ResponseCallback = Box<dyn FnOnce(&ActionResponse) + Send>;
type CrashCallback = Box<dyn FnOnce(&ActionClientError) + Send>;

/// Optional caller hooks for [`Dispatcher::execute_with_callbacks`].
#[derive(Default)]
pub struct ActionCallbacks {
    pub success: Option<ResponseCallback>,
    pub failure: Option<ResponseCallback>,
    pub crash: Option<CrashCallback>,
    pub loading: Option<LoadingCallback<'static>>,
}

impl ActionCallbacks {
    pub fn on_success(mut self, f: impl FnOnce(&ActionResponse) + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(&ActionResponse) + Send + 'static) -> Self {
        self.failure = Some(Box::new(f));
        self
    }

    pub fn on_crash(mut self, f: impl FnOnce(&ActionClientError) + Send + 'static) -> Self {
        self.crash = Some(Box::new(f));
        self
    }

    pub fn on_loading(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
        self.loading = Some(Box::new(f));
        self
    }
}

// ---------------------------------------------------------------------------
// DispatchOutcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Transformer evaluation is not implemented. A placeholder result was
    /// stored and no outcome callback fired.
    TransformerPending(ActionResult),
    Success {
        response: ActionResponse,
        result: ActionResult,
    },
    Failure {
        response: ActionResponse,
        result: ActionResult,
        classification: Classification,
    },
    /// Nothing was written to the store.
    Crash(ActionClientError),
}

impl DispatchOutcome {
    /// The result written to the store, if any.
    pub fn result(&self) -> Option<&ActionResult> {
        match self {
            DispatchOutcome::TransformerPending(result)
            | DispatchOutcome::Success { result, .. }
            | DispatchOutcome::Failure { result, .. } => Some(result),
            DispatchOutcome::Crash(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::TransformerPending(_) => "transformer_pending",
            DispatchOutcome::Success { .. } => "success",
            DispatchOutcome::Failure { .. } => "failure",
            DispatchOutcome::Crash(_) => "crash",
        }
    }
}

// ---------------------------------------------------------------------------
// In-flight tracking
// ---------------------------------------------------------------------------

/// Counts dispatches per action id. Overlaps are logged, not prevented.
#[derive(Debug, Default)]
struct InFlight {
    counts: Mutex<HashMap<String, usize>>,
}

struct InFlightGuard<'a> {
    owner: &'a InFlight,
    action_id: String,
}

impl InFlight {
    fn enter(&self, action_id: &str) -> InFlightGuard<'_> {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let n = counts.entry(action_id.to_string()).or_insert(0);
        if *n > 0 {
            tracing::warn!(
                action_id,
                in_flight = *n,
                "action dispatched while a previous run is in flight; last result wins"
            );
        }
        *n += 1;
        InFlightGuard {
            owner: self,
            action_id: action_id.to_string(),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut counts = self.owner.counts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(n) = counts.get_mut(&self.action_id) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                counts.remove(&self.action_id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    client: ActionClient,
    store: Arc<dyn ActionStore>,
    classifier: ErrorClassifier,
    tracker: Arc<PerformanceTracker>,
    app_id: String,
    user_agent: String,
    in_flight: InFlight,
}

impl Dispatcher {
    pub fn new(
        client: ActionClient,
        store: Arc<dyn ActionStore>,
        classifier: ErrorClassifier,
        app_id: impl Into<String>,
    ) -> Self {
        let user_agent = client.user_agent().to_string();
        Self {
            client,
            store,
            classifier,
            tracker: Arc::new(PerformanceTracker::new()),
            app_id: app_id.into(),
            user_agent,
            in_flight: InFlight::default(),
        }
    }

    /// Share a tracker with other dispatchers or observers.
    pub fn with_tracker(mut self, tracker: Arc<PerformanceTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// User agent appended to REST API headers (defaults to the client's).
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.tracker
    }

    pub fn client(&self) -> &ActionClient {
        &self.client
    }

    pub fn run_path(&self, action_id: &str) -> String {
        format!("/apps/{}/actions/{}/run", self.app_id, action_id)
    }

    pub fn run_url(&self, action_id: &str) -> String {
        self.client.resolve_url(&self.run_path(action_id))
    }

    /// Run `action` and write its result into the store.
    pub async fn execute(&self, action: &ActionDescriptor) -> DispatchOutcome {
        self.execute_with_callbacks(action, ActionCallbacks::default())
            .await
    }

    /// [`execute`](Self::execute) plus caller hooks.
    ///
    /// Network actions fire `loading(true)`, then exactly one of
    /// `success` / `failure` / `crash`, then `loading(false)`. Store writes
    /// happen before the outcome callback. Transformer actions fire nothing.
    pub async fn execute_with_callbacks(
        &self,
        action: &ActionDescriptor,
        callbacks: ActionCallbacks,
    ) -> DispatchOutcome {
        let ActionCallbacks {
            success,
            failure,
            crash,
            loading,
        } = callbacks;
        let action_id = action.action_id.as_str();

        // Preparing
        self.tracker.start(action_id);
        let url = self.run_url(action_id);
        let resource_index = self.client.timings().count_by_name(&url);

        if action.action_type.is_transformer() {
            // TODO: evaluate the transformer once a script runtime is wired in.
            let result = ActionResult::transformer_placeholder(action_id);
            self.store.update_action_result(action_id, result.clone());
            tracing::info!(action_id, "transformer action stored without evaluation");
            return DispatchOutcome::TransformerPending(result);
        }

        let _in_flight = self.in_flight.enter(action_id);
        tracing::info!(
            action_id,
            action_type = %action.action_type,
            display_name = %action.display_name,
            "running action"
        );

        let loading = LoadingGuard::new(loading);
        let outcome = match self.client.send(self.build_request(action)).await {
            Outcome::Success(response) => {
                let result = self.settle(action, &response, false, &url, resource_index);
                if let Some(f) = success {
                    f(&response);
                }
                DispatchOutcome::Success { response, result }
            }
            Outcome::Failure(response) => {
                let result = self.settle(action, &response, true, &url, resource_index);
                let classification = self.classifier.classify(action, &response);
                if let Some(f) = failure {
                    f(&response);
                }
                DispatchOutcome::Failure {
                    response,
                    result,
                    classification,
                }
            }
            Outcome::Crash(err) => {
                tracing::warn!(action_id, error = %err, "action crashed; stored result left untouched");
                if let Some(f) = crash {
                    f(&err);
                }
                DispatchOutcome::Crash(err)
            }
        };
        loading.finish();

        tracing::info!(action_id, outcome = outcome.as_str(), "action settled");
        outcome
    }

    fn build_request(&self, action: &ActionDescriptor) -> RequestConfig {
        let body = json!({
            "resourceId": action.resource_id,
            "actionType": action.action_type,
            "actionTemplate": action.action_template,
            "displayName": action.display_name,
        });

        let is_rest_api = action.action_type.is_rest_api();
        let user_agent = self.user_agent.clone();
        let tracker = Arc::clone(&self.tracker);
        let action_id = action.action_id.clone();

        RequestConfig::new(Method::Post, self.run_path(&action.action_id))
            .json(body)
            .transform_request(move |body| {
                let body = if is_rest_api {
                    append_user_agent(body, &user_agent)?
                } else {
                    body
                };
                serialize_body(body)
            })
            .transform_request(move |body| {
                tracker.end(&action_id);
                Ok(body)
            })
    }

    /// Store the result and republish the template for a settled response.
    fn settle(
        &self,
        action: &ActionDescriptor,
        response: &ActionResponse,
        error: bool,
        url: &str,
        resource_index: usize,
    ) -> ActionResult {
        let timings = self.client.timings();
        let mut resource = resource_metrics_for(timings, &response.request_id);
        if resource.is_empty() {
            resource = resource_metrics(timings, url, resource_index);
        }

        // Descriptor runtime, overridden by the last stored result.
        let mut runtime = action.runtime.clone().unwrap_or_default();
        if let Some(prev) = self.store.action_result(&action.action_id) {
            runtime = runtime.merge(&prev.runtime);
        }
        let mut runtime = runtime.merge(&resource);
        runtime.prepare_query = self.tracker.measure_ms(&action.action_id);

        let result = ActionResult {
            action_id: action.action_id.clone(),
            data: response.data.clone(),
            raw_data: response.data.clone(),
            error,
            runtime,
            updated_at: Utc::now(),
        };
        self.store
            .update_action_result(&action.action_id, result.clone());
        self.store.update_action_template(
            &action.action_id,
            template_with_data(&action.action_template, &response.data),
        );
        self.store
            .update_action_runtime(&action.action_id, result.runtime.clone());
        result
    }
}

/// Append `["User-Agent", ua]` to `actionTemplate.headers` of a JSON body.
///
/// A missing header list counts as empty. Non-JSON bodies pass through.
pub fn append_user_agent(
    body: RequestBody,
    user_agent: &str,
) -> action_client::Result<RequestBody> {
    let RequestBody::Json(mut value) = body else {
        return Ok(body);
    };
    let template = value
        .get_mut("actionTemplate")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ActionClientError::Transform("actionTemplate must be an object".into()))?;
    let headers = template
        .entry("headers")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| {
            ActionClientError::Transform(
                "actionTemplate.headers must be a list of [name, value] pairs".into(),
            )
        })?;
    headers.push(json!(["User-Agent", user_agent]));
    Ok(RequestBody::Json(value))
}

/// `{...template, data, rawData}`; a non-object template is replaced.
pub fn template_with_data(template: &Value, data: &Value) -> Value {
    let mut merged = match template {
        Value::Object(_) => template.clone(),
        _ => empty_object(),
    };
    if let Some(obj) = merged.as_object_mut() {
        obj.insert("data".to_string(), data.clone());
        obj.insert("rawData".to_string(), data.clone());
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
