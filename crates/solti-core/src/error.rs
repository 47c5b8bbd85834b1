use thiserror::Error;

use solti_model::SpecError;

use crate::runner::Phase;

/// Error returned by a single hook invocation.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid task: {0}")]
    InvalidTask(#[from] SpecError),
    #[error("io error: {0}")]
    Io(String),
    #[error("secret error: {0}")]
    Secret(String),
    #[error("artifact {artifact:?}: {reason}")]
    Artifact { artifact: String, reason: String },
    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for HookError {
    fn from(e: std::io::Error) -> Self {
        HookError::Io(e.to_string())
    }
}

/// Failure to load or store task-local state.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("state db io error: {0}")]
    Io(String),
    #[error("failed to encode local state: {0}")]
    Encode(String),
    #[error("failed to decode local state: {0}")]
    Decode(String),
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e.to_string())
    }
}

/// Error surfaced by a fail-fast phase.
#[derive(Error, Debug)]
pub enum PhaseError {
    /// A hook failed. When `recoverable` is set the whole phase may be retried from the top.
    #[error("{phase} hook {hook:?} failed: {source}")]
    Hook {
        phase: Phase,
        hook: String,
        recoverable: bool,
        #[source]
        source: HookError,
    },
    /// Hook state could not be written; resume-on-restart can no longer be trusted.
    #[error("failed to persist local state: {0}")]
    Persist(#[from] PersistError),
}

impl PhaseError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PhaseError::Hook {
                recoverable: true,
                ..
            }
        )
    }

    /// Name of the hook that caused the failure, if a hook did.
    pub fn hook(&self) -> Option<&str> {
        match self {
            PhaseError::Hook { hook, .. } => Some(hook),
            PhaseError::Persist(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse config {path}: {reason}")]
    Parse { path: String, reason: String },
}
