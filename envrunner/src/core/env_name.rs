//! Environment name rules and artifact file names.

use std::sync::LazyLock;

use regex::Regex;

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("env name regex"));

static CONFIG_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^config\.(?P<env>[A-Za-z0-9_-]+)\.json$").expect("config file regex")
});

pub fn is_valid_env_name(name: &str) -> bool {
    ENV_NAME_RE.is_match(name)
}

pub fn config_file_name(env_name: &str) -> String {
    format!("config.{env_name}.json")
}

pub fn state_file_name(env_name: &str) -> String {
    format!("state.{env_name}.json")
}

pub fn userdata_file_name(env_name: &str) -> String {
    format!("{env_name}.userdata")
}

/// Extract the environment name from a config file name (`config.<env>.json`).
pub fn env_name_from_config_file(file_name: &str) -> Option<&str> {
    CONFIG_FILE_RE
        .captures(file_name)
        .and_then(|caps| caps.name("env"))
        .map(|m| m.as_str())
}
