mod kv;
pub use kv::KeyValue;

mod flag;
pub use flag::Flag;

mod task_env;
pub use task_env::TaskEnv;

mod alloc_status;
pub use alloc_status::AllocStatus;

mod change_mode;
pub use change_mode::ChangeMode;

mod task_spec;
pub use task_spec::{ArtifactSpec, SecretSpec, SpecError, TaskSpec, TemplateSpec};

mod hook_state;
pub use hook_state::HookState;

mod local_state;
pub use local_state::LocalState;

/// Name of a hook as reported by [`HookState`] keys and log fields.
pub type HookName = String;

/// Delay value in milliseconds.
pub type DelayMs = u64;
