//! Component abstraction for phase execution.
//!
//! A [`Component`] is one pluggable resource (AAD app, bot, SQL, ...) that
//! may implement some lifecycle phases. The orchestrator only sees the trait;
//! tests plug in scripted components that return predetermined deltas.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::types::{Environment, Phase, StateDelta};

/// Read-only inputs shared by every component of one phase run.
///
/// The orchestrator passes it through untouched.
#[derive(Debug, Clone, Default)]
pub struct PhaseContext {
    pub project_root: PathBuf,
    pub env_name: String,
    /// Free-form caller inputs (subscription ids, flags, ...).
    pub inputs: Value,
}

impl PhaseContext {
    pub fn new(project_root: impl Into<PathBuf>, env_name: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            env_name: env_name.into(),
            inputs: Value::Null,
        }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }
}

/// A pluggable unit of work with a stable name.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Key of this component's sub-object in the environment state.
    fn name(&self) -> &str;

    /// Fields of this component's state that must be stored as secrets.
    fn secret_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn implements(&self, phase: Phase) -> bool;

    /// Run `phase` against an immutable snapshot of the environment.
    ///
    /// Returns the fields to merge into this component's state.
    async fn run(
        &self,
        phase: Phase,
        ctx: &PhaseContext,
        env: &Environment,
    ) -> anyhow::Result<StateDelta>;
}

/// Ordered component registry. Dispatch order is registry order.
pub type Registry = Vec<Arc<dyn Component>>;

/// Components of `registry` implementing `phase`, in registry order.
pub fn select_components(registry: &[Arc<dyn Component>], phase: Phase) -> Registry {
    registry
        .iter()
        .filter(|component| component.implements(phase))
        .cloned()
        .collect()
}
