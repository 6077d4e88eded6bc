//! Stderr diagnostics for the CLI and embedding hosts.
//!
//! Artifacts never pass through here, and secret values are never recorded.
//! Spans carry the environment name and phase, see `#[instrument]` on the
//! store and lifecycle entry points.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the process-wide subscriber for the CLI.
///
/// A host that already installed its own subscriber keeps it.
///
/// ```bash
/// RUST_LOG=envrunner::lifecycle=debug envrunner validate dev
/// ```
pub fn init() {
    if let Err(err) = try_init(DEFAULT_FILTER) {
        eprintln!("envrunner: diagnostics not installed: {err}");
    }
}

/// Install a compact stderr subscriber filtered by [`env_filter`].
pub fn try_init(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
}

/// `RUST_LOG` if it parses, otherwise `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_error_instead_of_panicking() {
        let _ = try_init("off");
        assert!(try_init("off").is_err());
    }
}
