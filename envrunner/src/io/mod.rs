//! Side-effecting environment artifact I/O.
//!
//! Every write goes through [`paths::write_atomic`]; nothing here spawns
//! tasks or talks to components.

pub mod config_store;
pub mod crypto;
pub mod paths;
pub mod settings;
pub mod state_store;
pub mod userdata;
