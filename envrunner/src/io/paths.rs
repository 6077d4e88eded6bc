//! Canonical artifact paths under `<project>/.fx/`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::env_name::{
    config_file_name, is_valid_env_name, state_file_name, userdata_file_name,
};
use crate::error::{EnvError, EnvResult};

pub const FX_DIR: &str = ".fx";

/// All canonical paths within `.fx/` for a project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub fx_dir: PathBuf,
    pub configs_dir: PathBuf,
    pub states_dir: PathBuf,
    pub settings_path: PathBuf,
}

/// Artifact paths of one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPaths {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub userdata_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let fx_dir = root.join(FX_DIR);
        Self {
            root,
            configs_dir: fx_dir.join("configs"),
            states_dir: fx_dir.join("states"),
            settings_path: fx_dir.join("settings.toml"),
            fx_dir,
        }
    }

    /// Paths of `env_name`'s artifacts. Rejects names that could escape the
    /// artifact folders.
    pub fn env(&self, env_name: &str) -> EnvResult<EnvPaths> {
        if !is_valid_env_name(env_name) {
            return Err(EnvError::InvalidEnvName(env_name.to_string()));
        }
        Ok(EnvPaths {
            config_path: self.configs_dir.join(config_file_name(env_name)),
            state_path: self.states_dir.join(state_file_name(env_name)),
            userdata_path: self.states_dir.join(userdata_file_name(env_name)),
        })
    }

    /// Fail with `PathNotExist` unless the project root exists.
    pub fn ensure_root(&self) -> EnvResult<()> {
        if !self.root.exists() {
            return Err(EnvError::PathNotExist(self.root.clone()));
        }
        Ok(())
    }
}

/// Atomically write `contents` to `path` (temp file + rename), creating the
/// parent directory if needed.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> EnvResult<()> {
    let parent = path.parent().ok_or_else(|| {
        EnvError::write(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
        )
    })?;
    fs::create_dir_all(parent).map_err(|err| EnvError::write(parent, err))?;
    let tmp_path = tmp_path_for(path);
    debug!(path = %path.display(), bytes = contents.len(), "writing artifact");
    fs::write(&tmp_path, contents).map_err(|err| EnvError::write(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| EnvError::write(path, err))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
