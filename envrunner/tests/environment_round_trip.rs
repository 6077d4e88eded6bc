//! Store round-trip tests against real artifacts in a temp project.
//!
//! Covers secret segregation, the exemption table, and the failure modes a
//! caller sees when artifacts are missing or tampered with.

use std::fs;

use envrunner::core::types::EnvState;
use envrunner::environment::EnvironmentStore;
use envrunner::error::EnvError;
use envrunner::io::settings::{EncryptionSettings, Settings};
use envrunner::test_support::{FakeCrypto, TestProject};
use serde_json::json;

fn state(value: serde_json::Value) -> EnvState {
    serde_json::from_value(value).expect("state")
}

/// Verifies save then load returns the same config and logical state.
#[test]
fn save_then_load_returns_identical_environment() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    let crypto = store.crypto_for("dev").expect("crypto");
    let original = state(json!({
        "fx-resource-aad-app-for-teams": {
            "clientId": "abc",
            "clientSecret": "s3cret",
            "secretFields": ["clientSecret"]
        },
        "fx-resource-bot": {
            "botId": "b1",
            "botPassword": "p@ss",
            "secretFields": ["botPassword"]
        },
        "solution": { "location": "westus", "tags": ["a", "b"] }
    }));

    store.save_state("dev", &original, &crypto).expect("save");
    let env = store.load_environment("dev", &crypto).expect("load");

    assert_eq!(env.state, original);
    assert_eq!(env.config, store.new_env_config("app-dev"));
}

/// Verifies a bot password is tokenized in state, encrypted in userdata, and
/// decrypted on reload.
#[test]
fn bot_password_is_tokenized_encrypted_and_restored() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    let crypto = store.crypto_for("dev").expect("crypto");
    let env_paths = project.paths.env("dev").expect("paths");

    store
        .save_state(
            "dev",
            &state(json!({ "bot": { "botPassword": "p@ss", "secretFields": ["botPassword"] } })),
            &crypto,
        )
        .expect("save");

    let state_text = fs::read_to_string(&env_paths.state_path).expect("state");
    let userdata = fs::read_to_string(&env_paths.userdata_path).expect("userdata");
    assert!(state_text.contains("{{bot.botPassword}}"));
    assert!(!state_text.contains("p@ss"));
    assert!(userdata.starts_with("bot.botPassword=crypto_"));
    assert!(!userdata.contains("p@ss"));

    let env = store.load_environment("dev", &crypto).expect("load");
    assert_eq!(env.state.component("bot").expect("bot")["botPassword"], "p@ss");
}

/// Verifies exempt keys are written in plaintext and loaded without decrypt.
#[test]
fn exempt_keys_bypass_encryption() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    let original = state(json!({
        "fx-resource-bot": {
            "botId": "bot-123",
            "botPassword": "p@ss",
            "secretFields": ["botId", "botPassword"]
        }
    }));

    store
        .save_state("dev", &original, &FakeCrypto::new())
        .expect("save");

    let userdata = fs::read_to_string(project.paths.env("dev").expect("paths").userdata_path)
        .expect("userdata");
    assert!(userdata.contains("fx-resource-bot.botId=bot-123\n"));
    assert!(userdata.contains("fx-resource-bot.botPassword=fake:ss@p\n"));

    let env = store
        .load_environment("dev", &FakeCrypto::new())
        .expect("load");
    assert_eq!(env.state, original);
}

/// Verifies an emptied exemption table encrypts every secret.
#[test]
fn empty_exemption_table_encrypts_everything() {
    let project = TestProject::with_settings(Settings {
        project_id: "p".to_string(),
        encryption: EncryptionSettings {
            exempt_keys: Vec::new(),
        },
        ..Settings::default()
    });
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");

    store
        .save_state(
            "dev",
            &state(json!({ "fx-resource-bot": { "botId": "bot-123", "secretFields": ["botId"] } })),
            &FakeCrypto::new(),
        )
        .expect("save");

    let userdata = fs::read_to_string(project.paths.env("dev").expect("paths").userdata_path)
        .expect("userdata");
    assert!(!userdata.contains("bot-123"));
}

/// Verifies a decrypt failure names the secret artifact and never the value.
#[test]
fn decrypt_failure_is_crypto_error() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    store
        .save_state(
            "dev",
            &state(json!({ "bot": { "botPassword": "p@ss", "secretFields": ["botPassword"] } })),
            &FakeCrypto::new(),
        )
        .expect("save");

    let err = store
        .load_environment("dev", &FakeCrypto::failing_decrypt())
        .unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, EnvError::Crypto { ref key, .. } if key == "bot.botPassword"));
    assert!(msg.contains("dev.userdata"), "{msg}");
    assert!(!msg.contains("p@ss"));
}

/// Verifies a missing secret artifact leaves tokens unresolved instead of failing.
#[test]
fn missing_userdata_keeps_tokens() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    let crypto = FakeCrypto::new();
    store
        .save_state(
            "dev",
            &state(json!({ "bot": { "botPassword": "p@ss", "secretFields": ["botPassword"] } })),
            &crypto,
        )
        .expect("save");
    fs::remove_file(project.paths.env("dev").expect("paths").userdata_path).expect("remove");

    let env = store.load_environment("dev", &crypto).expect("load");

    assert_eq!(
        env.state.component("bot").expect("bot")["botPassword"],
        "{{bot.botPassword}}"
    );
}

/// Verifies loading an unknown environment is NotFound, not an empty env.
#[test]
fn unknown_environment_is_not_found() {
    let project = TestProject::new();
    let store = EnvironmentStore::open(project.root()).expect("open");

    let err = store
        .load_environment("staging", &FakeCrypto::new())
        .unwrap_err();

    assert!(matches!(err, EnvError::NotFound { ref env_name, .. } if env_name == "staging"));
}

/// Verifies names that could escape `.fx/` are rejected before any I/O.
#[test]
fn path_like_env_names_are_rejected() {
    let project = TestProject::new();
    let store = EnvironmentStore::open(project.root()).expect("open");

    for name in ["../dev", "a/b", "", "dev.json"] {
        let err = store
            .save_config(name, &store.new_env_config("x"))
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidEnvName(_)), "{name}");
    }
}

/// Verifies remote listing drops the configured local environment.
#[test]
fn remote_listing_respects_custom_local_env() {
    let project = TestProject::with_settings(Settings {
        project_id: "p".to_string(),
        local_env: "sandbox".to_string(),
        ..Settings::default()
    });
    project.add_env("dev").add_env("local").add_env("sandbox");
    let store = EnvironmentStore::open(project.root()).expect("open");

    assert_eq!(
        store.list_remote_environments().expect("list"),
        vec!["dev", "local"]
    );
}

/// Verifies a secret field whose name holds a space survives two full
/// save/load cycles.
#[test]
fn spaced_secret_field_survives_repeated_save_and_load() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");
    let crypto = FakeCrypto::new();
    let original = state(json!({
        "bot": { "bot password": "p@ss", "secretFields": ["bot password"] }
    }));

    store.save_state("dev", &original, &crypto).expect("first save");
    let loaded = store.load_environment("dev", &crypto).expect("first load");
    assert_eq!(loaded.state, original);
    store.save_state("dev", &loaded.state, &crypto).expect("second save");
    let reloaded = store.load_environment("dev", &crypto).expect("second load");

    assert_eq!(reloaded.state, original);
    let userdata = fs::read_to_string(project.paths.env("dev").expect("paths").userdata_path)
        .expect("userdata");
    assert!(userdata.contains("bot.bot password=fake:"), "{userdata}");
}

/// Verifies a secret field name containing `=` is refused before any write.
#[test]
fn secret_field_with_equals_sign_is_schema_error() {
    let project = TestProject::new();
    project.add_env("dev");
    let store = EnvironmentStore::open(project.root()).expect("open");

    let err = store
        .save_state(
            "dev",
            &state(json!({ "bot": { "a=b": "v", "secretFields": ["a=b"] } })),
            &FakeCrypto::new(),
        )
        .unwrap_err();

    assert!(matches!(err, EnvError::Schema { .. }), "{err}");
    assert!(!project.paths.env("dev").expect("paths").state_path.exists());
}
