use crate::error::Result;
use crate::{io, paths};
use crate::types::{ActionDescriptor, ActionResult, RuntimeMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state: the action list and the latest result per
/// action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub app_id: String,
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
    #[serde(default)]
    pub results: BTreeMap<String, ActionResult>,
    #[serde(default)]
    pub selected: Option<String>,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl AppState {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            app_id: app_id.into(),
            actions: Vec::new(),
            results: BTreeMap::new(),
            selected: None,
            last_updated: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        io::read_yaml(&paths::state_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_yaml(&paths::state_path(root), self)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn action(&self, action_id: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.action_id == action_id)
    }

    pub fn action_mut(&mut self, action_id: &str) -> Option<&mut ActionDescriptor> {
        self.actions.iter_mut().find(|a| a.action_id == action_id)
    }

    pub fn action_by_display_name(&self, display_name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.display_name == display_name)
    }

    pub fn result(&self, action_id: &str) -> Option<&ActionResult> {
        self.results.get(action_id)
    }

    pub fn selected_action(&self) -> Option<&ActionDescriptor> {
        self.selected.as_deref().and_then(|id| self.action(id))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Replace the stored result for `action_id` wholesale.
    pub fn set_result(&mut self, action_id: &str, mut result: ActionResult) {
        result.action_id = action_id.to_string();
        self.results.insert(action_id.to_string(), result);
        self.last_updated = Utc::now();
    }

    /// Replace the template of a registered action. Returns `false` when no
    /// action with that id is registered.
    pub fn set_template(&mut self, action_id: &str, template: Value) -> bool {
        let Some(action) = self.action_mut(action_id) else {
            return false;
        };
        action.action_template = template;
        self.last_updated = Utc::now();
        true
    }

    /// Record the latest runtime metrics on a registered action so the next
    /// run merges over them.
    pub fn set_runtime(&mut self, action_id: &str, runtime: RuntimeMetrics) -> bool {
        let Some(action) = self.action_mut(action_id) else {
            return false;
        };
        action.runtime = Some(runtime);
        self.last_updated = Utc::now();
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
