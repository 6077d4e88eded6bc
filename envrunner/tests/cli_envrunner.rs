//! CLI tests: spawn the envrunner binary against temp projects and check
//! exit codes and output.

use std::process::{Command, Output};

use envrunner::environment::EnvironmentStore;
use envrunner::exit_codes;
use envrunner::io::paths::ProjectPaths;
use envrunner::io::settings::load_settings;
use serde_json::{Value, json};

fn envrunner(project: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_envrunner"))
        .arg("--project")
        .arg(project)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn envrunner")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn init_creates_settings_and_default_env() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = envrunner(temp.path(), &["init", "--app-name", "contoso"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).trim().ends_with("config.dev.json"));
    let settings = load_settings(&ProjectPaths::new(temp.path()).settings_path).expect("settings");
    assert_eq!(settings.project_id.len(), 32);
}

#[test]
fn init_refuses_existing_env_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let first = envrunner(temp.path(), &["init", "--app-name", "contoso"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));

    let again = envrunner(temp.path(), &["init", "--app-name", "contoso"]);
    assert_eq!(again.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&again.stderr).contains("already exists"));

    let forced = envrunner(temp.path(), &["init", "--app-name", "fabrikam", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn init_keeps_existing_project_id() {
    let temp = tempfile::tempdir().expect("tempdir");
    envrunner(temp.path(), &["init", "--app-name", "contoso"]);
    let settings_path = ProjectPaths::new(temp.path()).settings_path;
    let before = load_settings(&settings_path).expect("settings").project_id;

    envrunner(temp.path(), &["init", "--app-name", "contoso", "--env", "staging"]);

    assert_eq!(load_settings(&settings_path).expect("settings").project_id, before);
}

#[test]
fn list_prints_sorted_names_and_remote_filters_local() {
    let temp = tempfile::tempdir().expect("tempdir");
    for env in ["staging", "local", "dev"] {
        let output = envrunner(temp.path(), &["init", "--app-name", "a", "--env", env]);
        assert_eq!(output.status.code(), Some(exit_codes::OK), "{env}");
    }

    let all = envrunner(temp.path(), &["list"]);
    assert_eq!(stdout(&all), "dev\nlocal\nstaging\n");

    let remote = envrunner(temp.path(), &["list", "--remote"]);
    assert_eq!(stdout(&remote), "dev\nstaging\n");
}

#[test]
fn validate_reports_missing_env() {
    let temp = tempfile::tempdir().expect("tempdir");
    envrunner(temp.path(), &["init", "--app-name", "contoso"]);

    let ok = envrunner(temp.path(), &["validate", "dev"]);
    assert_eq!(ok.status.code(), Some(exit_codes::OK));

    let missing = envrunner(temp.path(), &["validate", "prod"]);
    assert_eq!(missing.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("not found"));
}

#[test]
fn show_masks_secret_fields() {
    let temp = tempfile::tempdir().expect("tempdir");
    envrunner(temp.path(), &["init", "--app-name", "contoso"]);
    let store = EnvironmentStore::open(temp.path()).expect("open");
    let crypto = store.crypto_for("dev").expect("crypto");
    let state = serde_json::from_value(json!({
        "bot": { "botId": "b1", "botPassword": "p@ss", "secretFields": ["botPassword"] }
    }))
    .expect("state");
    store.save_state("dev", &state, &crypto).expect("save");

    let output = envrunner(temp.path(), &["show", "dev"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(!text.contains("p@ss"));
    let doc: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(doc["state"]["bot"]["botPassword"], "********");
    assert_eq!(doc["state"]["bot"]["botId"], "b1");
    assert_eq!(doc["config"]["manifest"]["appName"]["short"], "contoso");
}

#[test]
fn missing_project_root_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = envrunner(&temp.path().join("nope"), &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}
