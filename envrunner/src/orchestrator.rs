//! Concurrent phase execution across components.
//!
//! One tokio task per selected component; fan-in waits for all of them and
//! keeps dispatch order. Nothing here touches the filesystem.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use crate::component::{Component, PhaseContext, select_components};
use crate::core::classify::{ComponentResult, PhaseOutcome, classify_results};
use crate::core::types::{EnvState, Environment, Phase, SECRET_FIELDS_KEY, StateDelta};
use crate::error::ComponentError;

/// A component operation ready to be spawned.
pub struct PhaseTask {
    pub component: String,
    pub phase: Phase,
    future: BoxFuture<'static, anyhow::Result<StateDelta>>,
}

impl PhaseTask {
    pub fn new(
        component: impl Into<String>,
        phase: Phase,
        future: BoxFuture<'static, anyhow::Result<StateDelta>>,
    ) -> Self {
        Self {
            component: component.into(),
            phase,
            future,
        }
    }

    /// Task running `component` for `phase` against a shared snapshot.
    pub fn for_component(
        component: Arc<dyn Component>,
        phase: Phase,
        ctx: Arc<PhaseContext>,
        env: Arc<Environment>,
    ) -> Self {
        let name = component.name().to_string();
        let future = async move { component.run(phase, &ctx, &env).await }.boxed();
        Self::new(name, phase, future)
    }
}

impl std::fmt::Debug for PhaseTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseTask")
            .field("component", &self.component)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Spawn every task and wait for all of them.
///
/// Results come back in the order of `tasks`, whatever the completion order.
/// A panicking task yields [`ComponentError::Panicked`]; siblings are never
/// cancelled.
pub async fn fan_out(tasks: Vec<PhaseTask>) -> Vec<ComponentResult> {
    let mut names = Vec::with_capacity(tasks.len());
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        debug!(component = %task.component, phase = %task.phase, "dispatching component");
        names.push(task.component);
        handles.push(tokio::spawn(task.future));
    }

    join_all(handles)
        .await
        .into_iter()
        .zip(names)
        .map(|(joined, component)| {
            let result = match joined {
                Ok(Ok(delta)) => Ok(delta),
                Ok(Err(err)) => Err(ComponentError::Failed(err)),
                Err(err) => Err(join_error(err)),
            };
            ComponentResult { component, result }
        })
        .collect()
}

/// Run `phase` on every component that implements it.
///
/// Every task sees the same `env` snapshot. Deltas of components declaring
/// secret fields carry the `secretFields` list.
#[instrument(skip_all, fields(phase = %phase, env = %env.name))]
pub async fn run_phase(
    phase: Phase,
    components: &[Arc<dyn Component>],
    ctx: Arc<PhaseContext>,
    env: Arc<Environment>,
) -> PhaseOutcome {
    let selected = select_components(components, phase);
    if selected.is_empty() {
        info!("no component implements phase");
        return PhaseOutcome::Success {
            merged: EnvState::new(),
        };
    }
    info!(components = selected.len(), "running phase");

    let tasks = selected
        .iter()
        .map(|component| {
            PhaseTask::for_component(Arc::clone(component), phase, Arc::clone(&ctx), Arc::clone(&env))
        })
        .collect();
    let mut results = fan_out(tasks).await;
    for (result, component) in results.iter_mut().zip(&selected) {
        if let Ok(delta) = &mut result.result {
            stamp_secret_fields(delta, &component.secret_fields());
        }
    }

    let outcome = classify_results(results);
    for failure in outcome.failures() {
        warn!(component = %failure.component, error = %failure.error, "component failed");
    }
    info!(outcome = outcome.kind(), "phase finished");
    outcome
}

fn stamp_secret_fields(delta: &mut StateDelta, secret_fields: &[String]) {
    if delta.is_empty() || secret_fields.is_empty() {
        return;
    }
    let fields = secret_fields.iter().cloned().map(Value::String).collect();
    delta.insert(SECRET_FIELDS_KEY.to_string(), Value::Array(fields));
}

fn join_error(err: JoinError) -> ComponentError {
    if !err.is_panic() {
        return ComponentError::Cancelled;
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    ComponentError::Panicked(message)
}
