//! Environment state persistence with secret segregation.
//!
//! The state artifact (`state.<env>.json`) holds the tokenized state tree.
//! The secret artifact (`<env>.userdata`) holds `component.field=value`
//! lines, encrypted unless the key is exempt.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::secrets::{EncryptionPolicy, SecretMap, restore_secrets, separate_secrets};
use crate::core::types::EnvState;
use crate::error::{EnvError, EnvResult};
use crate::io::crypto::CryptoProvider;
use crate::io::paths::{ProjectPaths, write_atomic};
use crate::io::userdata::{parse_userdata, serialize_userdata};

/// Persist `state`: tokenize secrets, encrypt them, then write the state
/// artifact followed by the secret artifact.
///
/// If the secret artifact write fails the error is returned and the caller
/// must retry the whole save; the state artifact alone only holds tokens.
#[instrument(skip_all, fields(env = env_name))]
pub fn save_state(
    paths: &ProjectPaths,
    env_name: &str,
    state: &EnvState,
    crypto: &dyn CryptoProvider,
    policy: &EncryptionPolicy,
) -> EnvResult<PathBuf> {
    let env_paths = paths.env(env_name)?;
    let artifact = artifact_name(&env_paths.userdata_path);

    let mut tokenized = state.clone();
    let mut secrets =
        separate_secrets(&mut tokenized).map_err(|details| EnvError::schema(env_name, details))?;
    encrypt_secrets(&mut secrets, crypto, policy, &artifact)?;

    let mut buf = serde_json::to_string_pretty(&tokenized)
        .map_err(|err| EnvError::parse(&env_paths.state_path, err))?;
    buf.push('\n');
    write_atomic(&env_paths.state_path, &buf)?;
    write_atomic(&env_paths.userdata_path, &serialize_userdata(&secrets))?;

    debug!(
        components = tokenized.len(),
        secrets = secrets.len(),
        "env state written"
    );
    Ok(env_paths.state_path)
}

/// Load the logical (decrypted) state of `env_name`.
///
/// A missing state artifact is an empty state; a missing secret artifact is
/// an empty secret map.
#[instrument(skip_all, fields(env = env_name))]
pub fn load_state(
    paths: &ProjectPaths,
    env_name: &str,
    crypto: &dyn CryptoProvider,
    policy: &EncryptionPolicy,
) -> EnvResult<EnvState> {
    let env_paths = paths.env(env_name)?;
    let secrets = load_secrets(&env_paths.userdata_path, env_name, crypto, policy)?;

    if !env_paths.state_path.exists() {
        debug!(path = %env_paths.state_path.display(), "no state artifact yet");
        return Ok(EnvState::new());
    }
    let path = &env_paths.state_path;
    let raw = fs::read_to_string(path).map_err(|err| EnvError::read(path, err))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| EnvError::parse(path, err))?;
    let mut state: EnvState = serde_json::from_value(value).map_err(|err| {
        EnvError::schema(env_name, format!("{}: {err}", artifact_name(path)))
    })?;

    let unresolved = restore_secrets(&mut state, &secrets);
    if !unresolved.is_empty() {
        warn!(keys = ?unresolved, "state references secrets missing from the secret artifact");
    }
    debug!(components = state.len(), secrets = secrets.len(), "env state loaded");
    Ok(state)
}

fn load_secrets(
    path: &Path,
    env_name: &str,
    crypto: &dyn CryptoProvider,
    policy: &EncryptionPolicy,
) -> EnvResult<SecretMap> {
    if !path.exists() {
        return Ok(SecretMap::new());
    }
    let artifact = artifact_name(path);
    let raw = fs::read_to_string(path).map_err(|err| EnvError::read(path, err))?;
    let mut secrets =
        parse_userdata(&raw).map_err(|err| EnvError::schema(env_name, format!("{artifact}: {err}")))?;
    for (key, value) in &mut secrets {
        if !policy.needs_encryption(key) {
            continue;
        }
        *value = crypto.decrypt(value).map_err(|source| EnvError::Crypto {
            artifact: artifact.clone(),
            key: key.clone(),
            source,
        })?;
    }
    Ok(secrets)
}

fn encrypt_secrets(
    secrets: &mut SecretMap,
    crypto: &dyn CryptoProvider,
    policy: &EncryptionPolicy,
    artifact: &str,
) -> EnvResult<()> {
    for (key, value) in secrets {
        if !policy.needs_encryption(key) {
            continue;
        }
        *value = crypto.encrypt(value).map_err(|source| EnvError::Crypto {
            artifact: artifact.to_string(),
            key: key.clone(),
            source,
        })?;
    }
    Ok(())
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
