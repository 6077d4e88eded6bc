//! Test helpers: temp projects, scripted components and a reversible crypto.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use crate::component::{Component, PhaseContext};
use crate::core::types::{Environment, Phase, StateDelta};
use crate::error::CryptoError;
use crate::io::config_store::{new_env_config, save_config};
use crate::io::crypto::CryptoProvider;
use crate::io::paths::ProjectPaths;
use crate::io::settings::{Settings, write_settings};

/// Temporary project directory with `.fx/settings.toml` in place.
pub struct TestProject {
    pub temp: TempDir,
    pub paths: ProjectPaths,
    pub settings: Settings,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_settings(Settings {
            project_id: "test-project".to_string(),
            ..Settings::default()
        })
    }

    pub fn with_settings(settings: Settings) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::new(temp.path());
        write_settings(&paths.settings_path, &settings).expect("write settings");
        Self {
            temp,
            paths,
            settings,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.temp.path()
    }

    /// Write a fresh config for `env_name` named after the environment.
    pub fn add_env(&self, env_name: &str) -> &Self {
        let config = new_env_config(&format!("app-{env_name}"), &self.settings.schema_url);
        save_config(&self.paths, env_name, &config).expect("save config");
        self
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Script {
    Returns(StateDelta),
    Fails(String),
    Panics(String),
}

/// Component returning a predetermined result.
///
/// Implements every phase unless narrowed with [`ScriptedComponent::phases`].
/// Records each `(phase, snapshot)` it was called with.
#[derive(Debug)]
pub struct ScriptedComponent {
    name: String,
    phases: Vec<Phase>,
    secret_fields: Vec<String>,
    script: Script,
    delay: Option<Duration>,
    barrier: Option<Arc<tokio::sync::Barrier>>,
    seen: Mutex<Vec<(Phase, Environment)>>,
}

impl ScriptedComponent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            phases: Phase::ALL.to_vec(),
            secret_fields: Vec::new(),
            script: Script::Returns(StateDelta::new()),
            delay: None,
            barrier: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn phases(mut self, phases: &[Phase]) -> Self {
        self.phases = phases.to_vec();
        self
    }

    pub fn secret_fields(mut self, fields: &[&str]) -> Self {
        self.secret_fields = fields.iter().map(|field| field.to_string()).collect();
        self
    }

    /// Succeed with `delta`, which must be a JSON object.
    pub fn returns(mut self, delta: Value) -> Self {
        let Value::Object(delta) = delta else {
            panic!("scripted delta must be a JSON object");
        };
        self.script = Script::Returns(delta);
        self
    }

    pub fn fails(mut self, message: &str) -> Self {
        self.script = Script::Fails(message.to_string());
        self
    }

    pub fn panics(mut self, message: &str) -> Self {
        self.script = Script::Panics(message.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wait on `barrier` before answering.
    pub fn barrier(mut self, barrier: Arc<tokio::sync::Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn seen(&self) -> Vec<(Phase, Environment)> {
        self.seen.lock().expect("seen lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().expect("seen lock").len()
    }
}

#[async_trait]
impl Component for ScriptedComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn secret_fields(&self) -> Vec<String> {
        self.secret_fields.clone()
    }

    fn implements(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    async fn run(
        &self,
        phase: Phase,
        _ctx: &PhaseContext,
        env: &Environment,
    ) -> anyhow::Result<StateDelta> {
        self.seen
            .lock()
            .expect("seen lock")
            .push((phase, env.clone()));
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Returns(delta) => Ok(delta.clone()),
            Script::Fails(message) => Err(anyhow::anyhow!("{message}")),
            Script::Panics(message) => panic!("{message}"),
        }
    }
}

/// Reversible stand-in for real encryption: `fake:` + reversed text.
#[derive(Debug, Clone, Default)]
pub struct FakeCrypto {
    fail_decrypt: bool,
}

impl FakeCrypto {
    pub const PREFIX: &'static str = "fake:";

    pub fn new() -> Self {
        Self::default()
    }

    /// A crypto whose `decrypt` always fails.
    pub fn failing_decrypt() -> Self {
        Self { fail_decrypt: true }
    }
}

impl CryptoProvider for FakeCrypto {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(format!("{}{}", Self::PREFIX, plaintext.chars().rev().collect::<String>()))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        if self.fail_decrypt {
            return Err(CryptoError::new("scripted decrypt failure"));
        }
        ciphertext
            .strip_prefix(Self::PREFIX)
            .map(|body| body.chars().rev().collect())
            .ok_or_else(|| CryptoError::new("missing fake prefix"))
    }
}
