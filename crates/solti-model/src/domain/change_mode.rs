use serde::{Deserialize, Serialize};

/// Action applied to a running task when a rendered template or its secret token changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum ChangeMode {
    /// Leave the task alone.
    Noop,
    /// Restart the task.
    #[default]
    Restart,
    /// Deliver a signal (e.g. `"SIGHUP"`) to the task.
    Signal { signal: String },
}
