//! Environment store: the project-scoped entry point for config and state.
//!
//! [`EnvironmentStore`] binds a project root to its settings and a
//! placeholder source, and checks the root exists before every operation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::env_name::env_name_from_config_file;
use crate::core::types::{EnvState, Environment};
use crate::core::template::{ProcessEnv, TemplateSource};
use crate::error::{EnvError, EnvResult};
use crate::io::config_store::{self, new_env_config};
use crate::io::crypto::{AesGcmCryptoProvider, CryptoProvider};
use crate::io::paths::ProjectPaths;
use crate::io::settings::{Settings, load_settings};
use crate::io::state_store;

/// Placeholder source shared across tasks.
pub type SharedTemplateSource = Arc<dyn TemplateSource + Send + Sync>;

#[derive(Clone)]
pub struct EnvironmentStore {
    paths: ProjectPaths,
    settings: Settings,
    source: SharedTemplateSource,
}

impl std::fmt::Debug for EnvironmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentStore")
            .field("root", &self.paths.root)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EnvironmentStore {
    /// Open the project at `root`, reading `.fx/settings.toml` if present.
    pub fn open(root: impl Into<PathBuf>) -> EnvResult<Self> {
        let paths = ProjectPaths::new(root);
        paths.ensure_root()?;
        let settings = load_settings(&paths.settings_path)?;
        Ok(Self::from_parts(paths, settings))
    }

    pub fn with_settings(root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self::from_parts(ProjectPaths::new(root), settings)
    }

    fn from_parts(paths: ProjectPaths, settings: Settings) -> Self {
        Self {
            paths,
            settings,
            source: Arc::new(ProcessEnv),
        }
    }

    /// Resolve `${env.VAR}` placeholders from `source` instead of the process
    /// environment.
    pub fn with_template_source(mut self, source: SharedTemplateSource) -> Self {
        self.source = source;
        self
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// AES-GCM provider keyed for `env_name` from the project id.
    pub fn crypto_for(&self, env_name: &str) -> EnvResult<AesGcmCryptoProvider> {
        AesGcmCryptoProvider::for_environment(&self.settings.project_id, env_name).map_err(|err| {
            EnvError::Settings {
                path: self.paths.settings_path.clone(),
                message: format!("cannot derive encryption key: {err}"),
            }
        })
    }

    /// Load config and decrypted state of `env_name`.
    #[instrument(skip_all, fields(env = env_name))]
    pub fn load_environment(
        &self,
        env_name: &str,
        crypto: &dyn CryptoProvider,
    ) -> EnvResult<Environment> {
        self.paths.ensure_root()?;
        let config = config_store::load_config(&self.paths, env_name, self.source.as_ref())?;
        let state = state_store::load_state(
            &self.paths,
            env_name,
            crypto,
            &self.settings.encryption_policy(),
        )?;
        Ok(Environment {
            name: env_name.to_string(),
            config,
            state,
        })
    }

    pub fn save_config(&self, env_name: &str, config: &Value) -> EnvResult<PathBuf> {
        self.paths.ensure_root()?;
        config_store::save_config(&self.paths, env_name, config)
    }

    pub fn save_state(
        &self,
        env_name: &str,
        state: &EnvState,
        crypto: &dyn CryptoProvider,
    ) -> EnvResult<PathBuf> {
        self.paths.ensure_root()?;
        state_store::save_state(
            &self.paths,
            env_name,
            state,
            crypto,
            &self.settings.encryption_policy(),
        )
    }

    /// Names of every environment with a config artifact, sorted.
    ///
    /// A name is listed only when its canonical `config.<env>.json` path
    /// resolves to a file, so every listed name loads.
    pub fn list_environments(&self) -> EnvResult<Vec<String>> {
        self.paths.ensure_root()?;
        let dir = &self.paths.configs_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(dir).map_err(|err| EnvError::read(dir, err))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| EnvError::read(dir, err))?;
            if !entry.path().is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(env) = file_name.to_str().and_then(env_name_from_config_file) else {
                continue;
            };
            match self.paths.env(env) {
                Ok(env_paths) if env_paths.config_path.is_file() => names.push(env.to_string()),
                _ => debug!(file = ?file_name, "skipping non-canonical config name"),
            }
        }
        names.sort();
        names.dedup();
        debug!(count = names.len(), "listed environments");
        Ok(names)
    }

    /// Like [`list_environments`](Self::list_environments) without the local
    /// environment.
    pub fn list_remote_environments(&self) -> EnvResult<Vec<String>> {
        let local = &self.settings.local_env;
        Ok(self
            .list_environments()?
            .into_iter()
            .filter(|name| name != local)
            .collect())
    }

    /// True iff `env_name` is among [`list_environments`](Self::list_environments).
    pub fn check_env_exists(&self, env_name: &str) -> EnvResult<bool> {
        self.paths.env(env_name)?;
        Ok(self
            .list_environments()?
            .iter()
            .any(|name| name == env_name))
    }

    /// True iff `path` is a config artifact directly inside the configs folder.
    pub fn is_env_config(&self, path: &Path) -> bool {
        let in_configs = path.parent() == Some(self.paths.configs_dir.as_path());
        in_configs
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(env_name_from_config_file)
                .is_some()
    }

    pub fn new_env_config(&self, app_name: &str) -> Value {
        new_env_config(app_name, &self.settings.schema_url)
    }
}
