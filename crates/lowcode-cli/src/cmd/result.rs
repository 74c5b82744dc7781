use crate::cmd::action::resolve_action_id;
use crate::output::{millis, pretty, print_json};
use anyhow::Context;
use clap::Subcommand;
use lowcode_core::state::AppState;
use std::path::Path;

#[derive(Subcommand)]
pub enum ResultSubcommand {
    /// Show the stored result of an action
    Show { action: String },
}

pub fn run(root: &Path, subcmd: ResultSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ResultSubcommand::Show { action } => show(root, &action, json),
    }
}

fn show(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    let result = state
        .result(&id)
        .with_context(|| format!("action '{key}' has not been run yet"))?;

    if json {
        return print_json(result);
    }

    println!("Result for: {id}");
    println!("Status:   {}", if result.error { "error" } else { "ok" });
    println!("Updated:  {}", result.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "Runtime:  prepare {}, network {}",
        millis(result.runtime.prepare_query),
        millis(result.runtime.network)
    );
    if let Some(size) = result.runtime.transfer_size {
        println!("Size:     {size} bytes");
    }
    println!("Data:\n{}", pretty(&result.data));
    Ok(())
}
