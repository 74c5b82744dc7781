use crate::state::AppState;
use crate::types::{ActionDescriptor, ActionResult, RuntimeMetrics};
use serde_json::Value;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read/write access to shared application state, as seen by the dispatcher.
///
/// Each call is atomic on its own; there are no multi-call transactions.
pub trait ActionStore: Send + Sync {
    /// Replace the result for `action_id`.
    fn update_action_result(&self, action_id: &str, result: ActionResult);

    /// Replace the stored template of `action_id`. Returns `false` if the
    /// action is not registered.
    fn update_action_template(&self, action_id: &str, template: Value) -> bool;

    /// Replace the runtime carried on the descriptor of `action_id`. Returns
    /// `false` if the action is not registered.
    fn update_action_runtime(&self, action_id: &str, runtime: RuntimeMetrics) -> bool;

    fn action_result(&self, action_id: &str) -> Option<ActionResult>;

    fn action(&self, action_id: &str) -> Option<ActionDescriptor>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store over an [`AppState`].
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<AppState>,
}

impl MemoryStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current state, e.g. for persisting.
    pub fn snapshot(&self) -> AppState {
        self.read().clone()
    }

    pub fn into_state(self) -> AppState {
        self.state.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ActionStore for MemoryStore {
    fn update_action_result(&self, action_id: &str, result: ActionResult) {
        self.write().set_result(action_id, result);
    }

    fn update_action_template(&self, action_id: &str, template: Value) -> bool {
        let updated = self.write().set_template(action_id, template);
        if !updated {
            tracing::debug!(action_id, "template not republished: action not registered");
        }
        updated
    }

    fn update_action_runtime(&self, action_id: &str, runtime: RuntimeMetrics) -> bool {
        self.write().set_runtime(action_id, runtime)
    }

    fn action_result(&self, action_id: &str) -> Option<ActionResult> {
        self.read().result(action_id).cloned()
    }

    fn action(&self, action_id: &str) -> Option<ActionDescriptor> {
        self.read().action(action_id).cloned()
    }
}
