use crate::output::{millis, pretty, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use lowcode_core::{state::AppState, types::ActionDescriptor, LowcodeError};
use std::path::Path;

#[derive(Subcommand)]
pub enum ActionSubcommand {
    /// List all actions
    List,
    /// Show an action descriptor
    Show { action: String },
    /// Add an action from a YAML or JSON descriptor file
    Add { file: String },
    /// Replace an action's descriptor from a file, keeping its id
    Update {
        action: String,
        file: String,
        /// Display name the edit was based on; rejects stale renames
        #[arg(long)]
        old_display_name: Option<String>,
    },
    /// Copy an action under a new id and name
    Duplicate { action: String },
    /// Delete an action and its result
    Delete { action: String },
    /// Mark an action as selected
    Select { action: String },
}

pub fn run(root: &Path, subcmd: ActionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActionSubcommand::List => list(root, json),
        ActionSubcommand::Show { action } => show(root, &action, json),
        ActionSubcommand::Add { file } => add(root, Path::new(&file), json),
        ActionSubcommand::Update {
            action,
            file,
            old_display_name,
        } => update(root, &action, Path::new(&file), old_display_name.as_deref(), json),
        ActionSubcommand::Duplicate { action } => duplicate(root, &action, json),
        ActionSubcommand::Delete { action } => delete(root, &action, json),
        ActionSubcommand::Select { action } => select(root, &action, json),
    }
}

/// Map an action id or display name to the action id.
pub fn resolve_action_id(state: &AppState, key: &str) -> anyhow::Result<String> {
    state
        .action(key)
        .or_else(|| state.action_by_display_name(key))
        .map(|a| a.action_id.clone())
        .ok_or_else(|| LowcodeError::ActionNotFound(key.to_string()).into())
}

fn read_descriptor(file: &Path) -> anyhow::Result<ActionDescriptor> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let descriptor: ActionDescriptor = serde_yaml::from_str(&data)
        .map_err(|e| LowcodeError::InvalidDescriptor(format!("{}: {e}", file.display())))?;
    Ok(descriptor)
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = AppState::load(root).context("failed to load state")?;

    if json {
        let summaries: Vec<_> = state
            .actions
            .iter()
            .map(|a| {
                let result = state.result(&a.action_id);
                serde_json::json!({
                    "action_id": a.action_id,
                    "display_name": a.display_name,
                    "action_type": a.action_type,
                    "resource_id": a.resource_id,
                    "selected": state.selected.as_deref() == Some(a.action_id.as_str()),
                    "has_result": result.is_some(),
                    "error": result.map(|r| r.error),
                })
            })
            .collect();
        return print_json(&summaries);
    }

    if state.actions.is_empty() {
        println!("No actions yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = state
        .actions
        .iter()
        .map(|a| {
            let status = match state.result(&a.action_id) {
                Some(r) if r.error => "error",
                Some(_) => "ok",
                None => "-",
            };
            let marker = if state.selected.as_deref() == Some(a.action_id.as_str()) {
                "*"
            } else {
                ""
            };
            vec![
                marker.to_string(),
                a.display_name.clone(),
                a.action_type.to_string(),
                status.to_string(),
                a.action_id.clone(),
            ]
        })
        .collect();
    print_table(&["", "NAME", "TYPE", "RESULT", "ID"], rows);
    Ok(())
}

fn show(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    let Some(action) = state.action(&id) else {
        return Err(LowcodeError::ActionNotFound(id).into());
    };

    if json {
        return print_json(action);
    }

    println!("Action: {} ({})", action.display_name, action.action_id);
    println!("Type:     {}", action.action_type);
    println!("Resource: {}", action.resource_id);
    if let Some(rt) = &action.runtime {
        println!(
            "Runtime:  prepare {}, network {}",
            millis(rt.prepare_query),
            millis(rt.network)
        );
    }
    println!("Template:\n{}", pretty(&action.action_template));
    Ok(())
}

fn add(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let descriptor = read_descriptor(file)?;
    let mut state = AppState::load(root).context("failed to load state")?;
    let added = state.add_action(descriptor)?.clone();
    state.save(root).context("failed to save state")?;

    if json {
        print_json(&added)?;
    } else {
        println!("Added action: {} ({})", added.display_name, added.action_id);
    }
    Ok(())
}

fn update(
    root: &Path,
    key: &str,
    file: &Path,
    old_display_name: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let descriptor = read_descriptor(file)?;
    let mut state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    state.update_action(&id, descriptor, old_display_name)?;
    state.save(root).context("failed to save state")?;

    if json {
        return print_json(&state.action(&id));
    }
    println!("Updated action: {id}");
    Ok(())
}

fn duplicate(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let mut state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    let copy = state.duplicate_action(&id)?.clone();
    state.save(root).context("failed to save state")?;

    if json {
        print_json(&copy)?;
    } else {
        println!("Duplicated as: {} ({})", copy.display_name, copy.action_id);
    }
    Ok(())
}

fn delete(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let mut state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    let removed = state.delete_action(&id)?;
    state.save(root).context("failed to save state")?;

    if json {
        print_json(&serde_json::json!({ "deleted": removed.action_id }))?;
    } else {
        println!("Deleted action: {} ({})", removed.display_name, removed.action_id);
    }
    Ok(())
}

fn select(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let mut state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    state.select_action(&id)?;
    state.save(root).context("failed to save state")?;

    if json {
        print_json(&serde_json::json!({ "selected": id }))?;
    } else {
        println!("Selected action: {id}");
    }
    Ok(())
}
