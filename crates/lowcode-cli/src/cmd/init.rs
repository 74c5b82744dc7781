use crate::output::print_json;
use anyhow::Context;
use lowcode_core::{config::Config, io, paths, state::AppState};
use std::path::Path;

pub fn run(root: &Path, app_id: &str, base_url: Option<&str>, json: bool) -> anyhow::Result<()> {
    let dir = paths::lowcode_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let config_created = !config_path.exists();
    if config_created {
        let mut cfg = Config::new(app_id);
        if let Some(url) = base_url {
            cfg.base_url = url.to_string();
        }
        cfg.save(root).context("failed to write config.yaml")?;
    }

    let state_path = paths::state_path(root);
    let state_created = !state_path.exists();
    if state_created {
        AppState::new(app_id)
            .save(root)
            .context("failed to write state.yaml")?;
    }

    if json {
        return print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "app_id": app_id,
            "config_created": config_created,
            "state_created": state_created,
        }));
    }

    println!("Initializing lowcode app in: {}", root.display());
    for (created, file) in [(config_created, paths::CONFIG_FILE), (state_created, paths::STATE_FILE)] {
        if created {
            println!("  created: {file}");
        } else {
            println!("  exists:  {file}");
        }
    }
    Ok(())
}
