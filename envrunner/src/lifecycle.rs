//! Phase lifecycle: load, run, merge, persist.
//!
//! [`Lifecycle`] couples the orchestrator with the store. Store errors
//! propagate; component errors stay inside the [`PhaseReport`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::component::{Component, PhaseContext};
use crate::core::classify::PhaseOutcome;
use crate::core::merge::merge_state;
use crate::core::types::Phase;
use crate::environment::EnvironmentStore;
use crate::error::{ComponentFailure, EnvError, EnvResult};
use crate::io::crypto::CryptoProvider;
use crate::orchestrator::run_phase;

/// Result of one executed phase.
#[derive(Debug)]
pub struct PhaseReport {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
    /// State artifact written after the phase, if any.
    pub state_path: Option<PathBuf>,
}

impl PhaseReport {
    pub fn kind(&self) -> &'static str {
        self.outcome.kind()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn failures(&self) -> &[ComponentFailure] {
        self.outcome.failures()
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Runs phases of one project against a component registry.
pub struct Lifecycle<'a> {
    store: &'a EnvironmentStore,
    components: &'a [Arc<dyn Component>],
    crypto: &'a dyn CryptoProvider,
    timeout: Option<Duration>,
}

impl<'a> Lifecycle<'a> {
    /// Phase timeout defaults to `phase_timeout_secs` from the settings.
    pub fn new(
        store: &'a EnvironmentStore,
        components: &'a [Arc<dyn Component>],
        crypto: &'a dyn CryptoProvider,
    ) -> Self {
        Self {
            store,
            components,
            crypto,
            timeout: store.settings().phase_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load `env_name`, run `phase`, and persist merged deltas on success or
    /// partial success.
    ///
    /// On timeout nothing is persisted; tasks already dispatched keep running
    /// in the background.
    #[instrument(skip_all, fields(env = env_name, phase = %phase))]
    pub async fn execute_phase(
        &self,
        env_name: &str,
        phase: Phase,
        ctx: PhaseContext,
    ) -> EnvResult<PhaseReport> {
        let env = Arc::new(self.store.load_environment(env_name, self.crypto)?);
        let running = run_phase(phase, self.components, Arc::new(ctx), Arc::clone(&env));
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, running).await.map_err(|_| {
                warn!(timeout = ?limit, "phase timed out");
                EnvError::TimedOut {
                    phase: phase.to_string(),
                    timeout: limit,
                }
            })?,
            None => running.await,
        };

        let state_path = match outcome.merged() {
            Some(merged) => {
                let mut state = env.state.clone();
                merge_state(&mut state, merged.clone());
                Some(self.store.save_state(env_name, &state, self.crypto)?)
            }
            None => None,
        };
        info!(
            outcome = outcome.kind(),
            failures = outcome.failures().len(),
            "phase complete"
        );
        Ok(PhaseReport {
            phase,
            outcome,
            state_path,
        })
    }

    /// Run `phases` in order, stopping after the first one that is not a
    /// full success. Returns every report produced.
    pub async fn execute_phases(
        &self,
        env_name: &str,
        phases: &[Phase],
        ctx: PhaseContext,
    ) -> EnvResult<Vec<PhaseReport>> {
        let mut reports = Vec::with_capacity(phases.len());
        for &phase in phases {
            let report = self.execute_phase(env_name, phase, ctx.clone()).await?;
            let stop = !report.is_success();
            reports.push(report);
            if stop {
                info!(phase = %phase, "prerequisite phase did not succeed, stopping");
                break;
            }
        }
        Ok(reports)
    }
}
