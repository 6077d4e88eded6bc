//! Per-environment config and state store with a concurrent component
//! orchestrator.
//!
//! A project keeps named environments under `.fx/`: a user-authored config,
//! a machine-written state tree, and a secret artifact holding encrypted
//! values the state refers to by `{{component.field}}` tokens.
//!
//! - **[`core`]**: pure logic (secret separation, merge, classification,
//!   template expansion). No I/O.
//! - **[`io`]**: artifact reads and writes, settings, encryption.
//! - **[`orchestrator`]**: runs one phase across components as tokio tasks.
//! - **[`environment`]** and **[`lifecycle`]**: the project-level entry
//!   points that tie the two together.

pub mod component;
pub mod core;
pub mod environment;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
