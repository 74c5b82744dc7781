use crate::cmd::action::resolve_action_id;
use crate::output::{millis, pretty, print_json};
use action_client::ActionClient;
use anyhow::Context;
use lowcode_core::{
    classifier::ErrorClassifier,
    config::Config,
    dispatcher::{DispatchOutcome, Dispatcher},
    state::AppState,
    store::MemoryStore,
    LowcodeError,
};
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let state = AppState::load(root).context("failed to load state")?;
    let id = resolve_action_id(&state, key)?;
    let Some(action) = state.action(&id).cloned() else {
        return Err(LowcodeError::ActionNotFound(id).into());
    };

    let client = ActionClient::new(config.client_config()?).context("failed to build client")?;
    let store = Arc::new(MemoryStore::new(state));
    let dispatcher = Dispatcher::new(
        client,
        store.clone(),
        ErrorClassifier::default(),
        config.app_id.clone(),
    );

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let outcome = rt.block_on(dispatcher.execute(&action));

    // Crashes leave state untouched, so there is nothing to persist.
    if outcome.result().is_some() {
        store
            .snapshot()
            .save(root)
            .context("failed to save state")?;
    }

    if json {
        print_json(&outcome_json(&outcome))?;
    } else {
        print_outcome(&action.display_name, &outcome);
    }

    match outcome {
        DispatchOutcome::Failure { classification, .. } => {
            anyhow::bail!("{}", classification.message)
        }
        DispatchOutcome::Crash(err) => {
            Err(anyhow::Error::new(err).context(format!("action '{}' crashed", action.display_name)))
        }
        _ => Ok(()),
    }
}

fn outcome_json(outcome: &DispatchOutcome) -> serde_json::Value {
    let mut value = serde_json::json!({
        "outcome": outcome.as_str(),
        "result": outcome.result(),
    });
    match outcome {
        DispatchOutcome::Success { response, .. } | DispatchOutcome::Failure { response, .. } => {
            value["status"] = response.status.into();
            value["request_id"] = response.request_id.clone().into();
        }
        _ => {}
    }
    match outcome {
        DispatchOutcome::Failure { classification, .. } => {
            value["classification"] = serde_json::to_value(classification).unwrap_or_default();
        }
        DispatchOutcome::Crash(err) => {
            value["error"] = err.to_string().into();
        }
        _ => {}
    }
    value
}

fn print_outcome(name: &str, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::TransformerPending(_) => {
            println!("{name}: transformer stored (evaluation pending)");
        }
        DispatchOutcome::Success { response, result } => {
            println!(
                "{name}: {} in {} (prepare {})",
                response.status,
                millis(result.runtime.network),
                millis(result.runtime.prepare_query)
            );
            println!("{}", pretty(&result.data));
        }
        DispatchOutcome::Failure {
            response, result, ..
        } => {
            println!("{name}: failed with {}", response.status);
            println!("{}", pretty(&result.data));
        }
        DispatchOutcome::Crash(_) => {}
    }
}
