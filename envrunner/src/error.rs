//! Typed errors for the environment store and the component orchestrator.
//!
//! Store operations fail fast with [`EnvError`]. Component failures are
//! never raised; they are collected as [`ComponentFailure`] values inside a
//! phase outcome.

use std::path::PathBuf;

/// Failure of a [`CryptoProvider`](crate::io::crypto::CryptoProvider) call.
///
/// Messages describe the failure mode only; they never carry plaintext.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CryptoError(pub String);

impl CryptoError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors raised by environment store operations.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// The project root does not exist.
    #[error("project path does not exist: {}", .0.display())]
    PathNotExist(PathBuf),

    /// Environment names are limited to `[A-Za-z0-9_-]+`.
    #[error("invalid environment name '{0}'")]
    InvalidEnvName(String),

    /// No config artifact exists for the environment.
    #[error("environment '{env_name}' not found (missing {})", path.display())]
    NotFound { env_name: String, path: PathBuf },

    /// Config or state failed structural validation.
    #[error("invalid environment '{env_name}': {details}")]
    Schema { env_name: String, details: String },

    /// Artifact text is not valid JSON (after template expansion for configs).
    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Encrypting or decrypting a secret failed.
    ///
    /// `artifact` is the file name of the secret artifact; `key` is the
    /// `component.field` key, never the value.
    #[error("crypto failure in {artifact} for key '{key}': {source}")]
    Crypto {
        artifact: String,
        key: String,
        #[source]
        source: CryptoError,
    },

    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisting an artifact failed. Callers retry the whole save.
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tool settings are unreadable or invalid.
    #[error("settings {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },

    /// A phase did not finish within the configured budget.
    ///
    /// Component tasks already dispatched keep running in the background.
    #[error("phase '{phase}' timed out after {timeout:?}")]
    TimedOut {
        phase: String,
        timeout: std::time::Duration,
    },
}

impl EnvError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(env_name: &str, details: impl Into<String>) -> Self {
        Self::Schema {
            env_name: env_name.to_string(),
            details: details.into(),
        }
    }
}

/// Error produced by a single component task.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// Business error returned by the component operation.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The component operation panicked.
    #[error("component task panicked: {0}")]
    Panicked(String),

    /// The runtime cancelled the component task.
    #[error("component task was cancelled")]
    Cancelled,
}

/// A component error tagged with the component that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{component}: {error}")]
pub struct ComponentFailure {
    pub component: String,
    #[source]
    pub error: ComponentError,
}

impl ComponentFailure {
    pub fn new(component: impl Into<String>, error: ComponentError) -> Self {
        Self {
            component: component.into(),
            error,
        }
    }
}

pub type EnvResult<T> = std::result::Result<T, EnvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_error_message_names_key_not_value() {
        let err = EnvError::Crypto {
            artifact: "dev.userdata".to_string(),
            key: "bot.botPassword".to_string(),
            source: CryptoError::new("authentication tag mismatch"),
        };
        let msg = err.to_string();
        assert!(msg.contains("dev.userdata"));
        assert!(msg.contains("bot.botPassword"));
        assert!(msg.contains("authentication tag mismatch"));
    }

    #[test]
    fn component_failure_display_includes_component_name() {
        let failure = ComponentFailure::new(
            "bot",
            ComponentError::Failed(anyhow::anyhow!("network unreachable")),
        );
        assert_eq!(failure.to_string(), "bot: network unreachable");
    }
}
