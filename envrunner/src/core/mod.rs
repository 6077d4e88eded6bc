//! In-memory environment logic with no filesystem or network access.
//!
//! - [`types`]: state tree, deltas, phases
//! - [`merge`]: folding component deltas into the state tree
//! - [`classify`]: turning per-component results into a phase outcome
//! - [`secrets`]: token substitution for declared secret fields
//! - [`env_name`]: name rules and artifact file names
//! - [`template`]: `${env.VAR}` placeholder expansion

pub mod classify;
pub mod env_name;
pub mod merge;
pub mod secrets;
pub mod template;
pub mod types;
