//! Tool settings stored under `.fx/settings.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::env_name::is_valid_env_name;
use crate::core::secrets::{DEFAULT_EXEMPT_KEYS, EncryptionPolicy};
use crate::error::{EnvError, EnvResult};
use crate::io::paths::write_atomic;

pub const DEFAULT_SCHEMA_URL: &str = "https://aka.ms/teamsfx-env-config-schema";

/// Project-level settings (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Seed of the per-environment encryption key. Generated by `init`.
    pub project_id: String,

    /// Environment used when the caller names none.
    pub default_env: String,

    /// Environment excluded from remote listings.
    pub local_env: String,

    /// `$schema` written into new config artifacts.
    pub schema_url: String,

    /// Wall-clock budget for one phase. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_timeout_secs: Option<u64>,

    pub encryption: EncryptionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncryptionSettings {
    /// `component.field` keys stored in plaintext in the secret artifact.
    pub exempt_keys: Vec<String>,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            exempt_keys: DEFAULT_EXEMPT_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            default_env: "dev".to_string(),
            local_env: "local".to_string(),
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            phase_timeout_secs: None,
            encryption: EncryptionSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_env_name(&self.default_env) {
            return Err(format!("default_env '{}' is not a valid name", self.default_env));
        }
        if !is_valid_env_name(&self.local_env) {
            return Err(format!("local_env '{}' is not a valid name", self.local_env));
        }
        if self.schema_url.trim().is_empty() {
            return Err("schema_url must be non-empty".to_string());
        }
        if self.phase_timeout_secs == Some(0) {
            return Err("phase_timeout_secs must be > 0".to_string());
        }
        if let Some(key) = self
            .encryption
            .exempt_keys
            .iter()
            .find(|key| !key.contains('.'))
        {
            return Err(format!(
                "encryption.exempt_keys entry '{key}' must be 'component.field'"
            ));
        }
        Ok(())
    }

    pub fn encryption_policy(&self) -> EncryptionPolicy {
        EncryptionPolicy::new(self.encryption.exempt_keys.iter().cloned())
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }
}

/// Random 128-bit project id, hex encoded.
pub fn generate_project_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> EnvResult<Settings> {
    let invalid = |message: String| EnvError::Settings {
        path: path.to_path_buf(),
        message,
    };
    if !path.exists() {
        debug!(path = %path.display(), "settings missing, using defaults");
        let settings = Settings::default();
        settings.validate().map_err(invalid)?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).map_err(|err| EnvError::read(path, err))?;
    let settings: Settings = toml::from_str(&contents).map_err(|err| invalid(err.to_string()))?;
    settings.validate().map_err(invalid)?;
    Ok(settings)
}

/// Atomically write settings to disk.
pub fn write_settings(path: &Path, settings: &Settings) -> EnvResult<()> {
    let invalid = |message: String| EnvError::Settings {
        path: path.to_path_buf(),
        message,
    };
    settings.validate().map_err(invalid)?;
    let mut buf = toml::to_string_pretty(settings).map_err(|err| invalid(err.to_string()))?;
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    write_atomic(path, &buf)
}
