//! Environment config load/save with template expansion and schema validation.

use std::fs;

use jsonschema::Draft;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::core::template::{TemplateSource, expand_env_placeholders};
use crate::error::{EnvError, EnvResult};
use crate::io::paths::{ProjectPaths, write_atomic};

const ENV_CONFIG_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/env_config.schema.json"
));

const ENV_CONFIG_DESCRIPTION: &str = "You can customize the config for different environments. \
     Environment variable placeholders are expanded when the config is loaded.";

/// Fresh config for a new environment, carrying the `$schema` reference.
pub fn new_env_config(app_name: &str, schema_url: &str) -> Value {
    json!({
        "$schema": schema_url,
        "description": ENV_CONFIG_DESCRIPTION,
        "manifest": {
            "appName": {
                "short": app_name,
                "full": format!("Full name for {app_name}")
            }
        }
    })
}

/// Load, expand and validate the config of `env_name`.
///
/// `${env.VAR}` placeholders are expanded from `source` before parsing.
#[instrument(skip_all, fields(env = env_name))]
pub fn load_config<S: TemplateSource + ?Sized>(
    paths: &ProjectPaths,
    env_name: &str,
    source: &S,
) -> EnvResult<Value> {
    let env_paths = paths.env(env_name)?;
    let path = &env_paths.config_path;
    if !path.exists() {
        return Err(EnvError::NotFound {
            env_name: env_name.to_string(),
            path: path.clone(),
        });
    }
    debug!(path = %path.display(), "loading env config");
    let raw = fs::read_to_string(path).map_err(|err| EnvError::read(path, err))?;
    let expanded = expand_env_placeholders(&raw, source);
    let config: Value = serde_json::from_str(&expanded).map_err(|err| EnvError::parse(path, err))?;
    validate_config(env_name, &config)?;
    Ok(config)
}

/// Write `config` for `env_name`, creating the configs folder if absent.
pub fn save_config(
    paths: &ProjectPaths,
    env_name: &str,
    config: &Value,
) -> EnvResult<std::path::PathBuf> {
    let env_paths = paths.env(env_name)?;
    let path = env_paths.config_path;
    let mut buf = serde_json::to_string_pretty(config).map_err(|err| EnvError::parse(&path, err))?;
    buf.push('\n');
    write_atomic(&path, &buf)?;
    debug!(path = %path.display(), "env config written");
    Ok(path)
}

/// Validate a config value against the bundled env-config schema.
pub fn validate_config(env_name: &str, config: &Value) -> EnvResult<()> {
    let schema: Value = serde_json::from_str(ENV_CONFIG_SCHEMA)
        .map_err(|err| EnvError::schema(env_name, format!("bundled schema: {err}")))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| EnvError::schema(env_name, format!("compile schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(config)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(EnvError::schema(env_name, messages.join("; ")));
    }
    Ok(())
}
