#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lowcode(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lowcode").unwrap();
    cmd.current_dir(dir.path())
        .env("LOWCODE_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_app(dir: &TempDir, base_url: &str) {
    lowcode(dir)
        .args(["init", "--app-id", "app1", "--base-url", base_url])
        .assert()
        .success();
}

fn write_descriptor(dir: &TempDir, file: &str, body: &str) -> String {
    let path = dir.path().join(file);
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

const REST_ACTION: &str = r#"
actionId: a1
resourceId: r1
actionType: restapi
displayName: getUsers
actionTemplate:
  url: /users
  headers:
    - [X, "1"]
"#;

fn add_rest_action(dir: &TempDir) {
    let file = write_descriptor(dir, "a1.yaml", REST_ACTION);
    lowcode(dir).args(["action", "add", &file]).assert().success();
}

fn state_yaml(dir: &TempDir) -> serde_yaml::Value {
    let data = std::fs::read_to_string(dir.path().join(".lowcode/state.yaml")).unwrap();
    serde_yaml::from_str(&data).unwrap()
}

// ---------------------------------------------------------------------------
// lowcode init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_state() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");

    assert!(dir.path().join(".lowcode/config.yaml").exists());
    assert!(dir.path().join(".lowcode/state.yaml").exists());

    let config = std::fs::read_to_string(dir.path().join(".lowcode/config.yaml")).unwrap();
    assert!(config.contains("app_id: app1"));
    assert!(config.contains("http://localhost:9/api"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    lowcode(&dir)
        .args(["init", "--app-id", "app1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    lowcode(&dir)
        .args(["action", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// lowcode action
// ---------------------------------------------------------------------------

#[test]
fn action_add_and_list() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    add_rest_action(&dir);

    lowcode(&dir)
        .args(["action", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("getUsers"))
        .stdout(predicate::str::contains("restapi"));
}

#[test]
fn action_add_duplicate_name_fails() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    add_rest_action(&dir);

    let file = write_descriptor(
        &dir,
        "dup.yaml",
        "actionType: mysql\ndisplayName: getUsers\n",
    );
    lowcode(&dir)
        .args(["action", "add", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("display name already in use"));
}

#[test]
fn action_add_invalid_descriptor_fails() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    let file = write_descriptor(&dir, "bad.yaml", "resourceId: r1\n");
    lowcode(&dir)
        .args(["action", "add", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid action descriptor"));
}

#[test]
fn action_add_rejects_path_like_id() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    let file = write_descriptor(
        &dir,
        "bad-id.yaml",
        "actionId: ../admin\nactionType: restapi\ndisplayName: sneaky\n",
    );
    lowcode(&dir)
        .args(["action", "add", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid action id"));
    assert!(state_yaml(&dir)["actions"].as_sequence().unwrap().is_empty());
}

#[test]
fn action_update_rename_and_stale_rename() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    add_rest_action(&dir);

    let renamed = write_descriptor(
        &dir,
        "renamed.yaml",
        &REST_ACTION.replace("getUsers", "listUsers"),
    );
    lowcode(&dir)
        .args(["action", "update", "a1", &renamed, "--old-display-name", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stale rename"));

    lowcode(&dir)
        .args(["action", "update", "getUsers", &renamed, "--old-display-name", "getUsers"])
        .assert()
        .success();

    lowcode(&dir)
        .args(["action", "show", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("listUsers"));
}

#[test]
fn action_duplicate_select_delete() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    add_rest_action(&dir);

    let output = lowcode(&dir)
        .args(["action", "duplicate", "a1", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let copy: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(copy["displayName"], "getUsers_copy");
    assert_ne!(copy["actionId"], "a1");

    lowcode(&dir).args(["action", "select", "a1"]).assert().success();
    assert_eq!(state_yaml(&dir)["selected"].as_str(), Some("a1"));

    lowcode(&dir).args(["action", "delete", "a1"]).assert().success();
    let state = state_yaml(&dir);
    assert!(state["selected"].is_null());
    assert_eq!(state["actions"].as_sequence().unwrap().len(), 1);

    lowcode(&dir)
        .args(["action", "show", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("action not found"));
}

// ---------------------------------------------------------------------------
// lowcode run / result
// ---------------------------------------------------------------------------

#[test]
fn run_success_persists_result_and_template() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/apps/app1/actions/a1/run")
        .match_header("x-request-id", mockito::Matcher::Any)
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "resourceId": "r1",
            "displayName": "getUsers",
        })))
        .with_status(200)
        .with_body(r#"{"users":[1,2]}"#)
        .create();

    let dir = TempDir::new().unwrap();
    init_app(&dir, &server.url());
    add_rest_action(&dir);

    lowcode(&dir)
        .args(["run", "getUsers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("getUsers: 200"));
    mock.assert();

    let state = state_yaml(&dir);
    let result = &state["results"]["a1"];
    assert_eq!(result["error"].as_bool(), Some(false));
    assert_eq!(result["data"]["users"][1].as_u64(), Some(2));
    assert_eq!(result["rawData"], result["data"]);
    let template = &state["actions"][0]["actionTemplate"];
    assert_eq!(template["rawData"]["users"][0].as_u64(), Some(1));
    assert_eq!(template["url"].as_str(), Some("/users"));

    lowcode(&dir)
        .args(["result", "show", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:   ok"));
}

#[test]
fn run_failure_stores_error_and_exits_nonzero() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/apps/app1/actions/a1/run")
        .with_status(500)
        .with_body(r#"{"message":"bad"}"#)
        .create();

    let dir = TempDir::new().unwrap();
    init_app(&dir, &server.url());
    add_rest_action(&dir);

    lowcode(&dir)
        .args(["run", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("getUsers: bad"));

    let output = lowcode(&dir)
        .args(["result", "show", "a1", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["error"], true);
    assert_eq!(result["data"]["message"], "bad");
}

#[test]
fn run_crash_leaves_state_untouched() {
    // Nothing listens on port 9 (discard) in the test environment.
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://127.0.0.1:9/api");
    add_rest_action(&dir);
    let before = std::fs::read_to_string(dir.path().join(".lowcode/state.yaml")).unwrap();

    lowcode(&dir)
        .args(["run", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("crashed"));

    let after = std::fs::read_to_string(dir.path().join(".lowcode/state.yaml")).unwrap();
    assert_eq!(before, after);

    lowcode(&dir)
        .args(["result", "show", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been run yet"));
}

#[test]
fn run_transformer_stores_placeholder() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://127.0.0.1:9/api");
    let file = write_descriptor(
        &dir,
        "t.yaml",
        "actionId: t1\nactionType: transformer\ndisplayName: shape\n",
    );
    lowcode(&dir).args(["action", "add", &file]).assert().success();

    let output = lowcode(&dir)
        .args(["run", "shape", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["outcome"], "transformer_pending");
    assert_eq!(json["result"]["data"], serde_json::json!({}));
}

// ---------------------------------------------------------------------------
// lowcode config validate
// ---------------------------------------------------------------------------

#[test]
fn config_validate_passes_for_fresh_app() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "http://localhost:9/api");
    lowcode(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_bad_base_url() {
    let dir = TempDir::new().unwrap();
    init_app(&dir, "ftp://example.com");
    lowcode(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("must start with http"));

    add_rest_action(&dir);
    lowcode(&dir)
        .args(["run", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}
