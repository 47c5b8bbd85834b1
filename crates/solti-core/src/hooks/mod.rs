//! Built-in hooks composed by [`crate::build_hooks`].

mod artifacts;
pub use artifacts::ArtifactHook;

mod secret;
pub use secret::{SecretHook, SecretHookDeps, TOKEN_FILE};

mod shutdown_delay;
pub use shutdown_delay::ShutdownDelayHook;

mod task_dir;
pub use task_dir::TaskDirHook;

mod template;
pub use template::{TemplateHook, render};

mod validate;
pub use validate::ValidateHook;

use solti_model::ChangeMode;

use crate::{
    collab::{EventSink, TaskEvent, TaskEventKind, TaskLifecycle},
    error::HookError,
};

pub const VALIDATE: &str = "validate";
pub const TASK_DIR: &str = "task_dir";
pub const ARTIFACTS: &str = "artifacts";
pub const SHUTDOWN_DELAY: &str = "shutdown_delay";
pub const SECRET: &str = "secret";
pub const TEMPLATE: &str = "template";

/// Apply a single change mode to the running task, announcing it on `events` first.
pub(crate) async fn apply_change_mode(
    lifecycle: &dyn TaskLifecycle,
    events: &dyn EventSink,
    mode: &ChangeMode,
    reason: &str,
) -> Result<(), HookError> {
    match mode {
        ChangeMode::Noop => Ok(()),
        ChangeMode::Restart => {
            let event = TaskEvent::new(TaskEventKind::RestartRequested, reason);
            events.emit(event.clone());
            lifecycle.restart(event).await
        }
        ChangeMode::Signal { signal } => {
            let event = TaskEvent::new(
                TaskEventKind::SignalRequested,
                format!("{reason}, sending {signal}"),
            );
            events.emit(event.clone());
            lifecycle.signal(event, signal).await
        }
    }
}
