//! The action list: add, update (including rename), duplicate, delete, select.

use crate::error::{LowcodeError, Result};
use crate::state::AppState;
use crate::types::ActionDescriptor;
use chrono::Utc;
use uuid::Uuid;

/// Display names are referenced from widget expressions, so they must be
/// identifiers: `[A-Za-z_$][A-Za-z0-9_$]*`.
pub fn is_valid_display_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Ids are interpolated into the run URL path: `[A-Za-z0-9_-]+`.
pub fn is_valid_action_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn new_action_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl AppState {
    /// Register a new action. An empty `action_id` gets a generated one.
    pub fn add_action(&mut self, mut action: ActionDescriptor) -> Result<&ActionDescriptor> {
        if action.action_id.is_empty() {
            action.action_id = new_action_id();
        } else if !is_valid_action_id(&action.action_id) {
            return Err(LowcodeError::InvalidActionId(action.action_id));
        } else if self.action(&action.action_id).is_some() {
            return Err(LowcodeError::ActionExists(action.action_id));
        }
        self.check_display_name(&action.display_name, None)?;

        tracing::debug!(action_id = %action.action_id, display_name = %action.display_name, "action added");
        self.actions.push(action);
        self.last_updated = Utc::now();
        Ok(&self.actions[self.actions.len() - 1])
    }

    /// Replace an action's descriptor, keeping its id and list position.
    ///
    /// `old_display_name`, when given, must match the stored name; a mismatch
    /// means the caller edited a stale copy.
    pub fn update_action(
        &mut self,
        action_id: &str,
        mut updated: ActionDescriptor,
        old_display_name: Option<&str>,
    ) -> Result<()> {
        let current = self
            .action(action_id)
            .ok_or_else(|| LowcodeError::ActionNotFound(action_id.to_string()))?;

        if let Some(expected) = old_display_name {
            if current.display_name != expected {
                return Err(LowcodeError::StaleRename {
                    action_id: action_id.to_string(),
                    expected: expected.to_string(),
                    found: current.display_name.clone(),
                });
            }
        }
        if current.display_name != updated.display_name {
            self.check_display_name(&updated.display_name, Some(action_id))?;
            tracing::info!(action_id, from = %current.display_name, to = %updated.display_name, "action renamed");
        }

        updated.action_id = action_id.to_string();
        if let Some(slot) = self.action_mut(action_id) {
            *slot = updated;
        }
        self.last_updated = Utc::now();
        Ok(())
    }

    /// Copy an action under a fresh id and the first free `<name>_copy[N]`
    /// display name. The copy is inserted right after the original and has
    /// no result.
    pub fn duplicate_action(&mut self, action_id: &str) -> Result<&ActionDescriptor> {
        let pos = self
            .actions
            .iter()
            .position(|a| a.action_id == action_id)
            .ok_or_else(|| LowcodeError::ActionNotFound(action_id.to_string()))?;

        let mut copy = self.actions[pos].clone();
        copy.action_id = new_action_id();
        copy.display_name = self.free_copy_name(&copy.display_name);
        copy.runtime = None;

        self.actions.insert(pos + 1, copy);
        self.last_updated = Utc::now();
        Ok(&self.actions[pos + 1])
    }

    /// Remove an action and its result. Clears the selection if it pointed
    /// at the removed action.
    pub fn delete_action(&mut self, action_id: &str) -> Result<ActionDescriptor> {
        let pos = self
            .actions
            .iter()
            .position(|a| a.action_id == action_id)
            .ok_or_else(|| LowcodeError::ActionNotFound(action_id.to_string()))?;

        let removed = self.actions.remove(pos);
        self.results.remove(action_id);
        if self.selected.as_deref() == Some(action_id) {
            self.selected = None;
        }
        self.last_updated = Utc::now();
        Ok(removed)
    }

    pub fn select_action(&mut self, action_id: &str) -> Result<()> {
        if self.action(action_id).is_none() {
            return Err(LowcodeError::ActionNotFound(action_id.to_string()));
        }
        self.selected = Some(action_id.to_string());
        self.last_updated = Utc::now();
        Ok(())
    }

    fn check_display_name(&self, name: &str, except_id: Option<&str>) -> Result<()> {
        if !is_valid_display_name(name) {
            return Err(LowcodeError::InvalidDisplayName(name.to_string()));
        }
        let taken = self
            .actions
            .iter()
            .any(|a| a.display_name == name && Some(a.action_id.as_str()) != except_id);
        if taken {
            return Err(LowcodeError::DuplicateDisplayName(name.to_string()));
        }
        Ok(())
    }

    fn free_copy_name(&self, base: &str) -> String {
        let first = format!("{base}_copy");
        if self.action_by_display_name(&first).is_none() {
            return first;
        }
        (2..)
            .map(|n| format!("{base}_copy{n}"))
            .find(|name| self.action_by_display_name(name).is_none())
            .unwrap_or(first)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
