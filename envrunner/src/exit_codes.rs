//! Stable exit codes for envrunner CLI commands.

/// Command succeeded; the phase (if any) fully succeeded.
pub const OK: i32 = 0;
/// Invalid project, settings, environment name, or artifact.
pub const INVALID: i32 = 1;
/// Some components failed; progress of the others was persisted.
pub const PARTIAL: i32 = 2;
/// Every selected component failed.
pub const FAILED: i32 = 3;
