use std::{path::PathBuf, sync::Arc};

use solti_model::{TaskEnv, TaskSpec};

/// Input of a prestart hook.
#[derive(Debug, Clone)]
pub struct PrestartRequest {
    pub task: Arc<TaskSpec>,
    /// Root of the task directory.
    pub task_dir: PathBuf,
    /// Environment accumulated so far, including earlier hooks of the same pass.
    pub env: TaskEnv,
    /// Current secret token; empty when the task has none.
    pub secret_token: String,
}

/// Output of a prestart hook.
///
/// State is only recorded when `hook_data` is set; `done` then marks the hook's one-time setup complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrestartResponse {
    pub hook_data: Option<Vec<u8>>,
    pub done: bool,
    pub env: TaskEnv,
}

impl PrestartResponse {
    /// Setup finished; record `data` and never run this hook again for the task.
    pub fn done(data: impl Into<Vec<u8>>) -> Self {
        Self {
            hook_data: Some(data.into()),
            done: true,
            env: TaskEnv::new(),
        }
    }

    /// Record `data` but run the hook again on the next pass.
    pub fn pending(data: impl Into<Vec<u8>>) -> Self {
        Self {
            hook_data: Some(data.into()),
            done: false,
            env: TaskEnv::new(),
        }
    }

    pub fn with_env(mut self, env: TaskEnv) -> Self {
        self.env = env;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoststartRequest {
    pub task_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoststartResponse;

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub task_name: String,
    /// Freshly read secret token.
    pub secret_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResponse;

#[derive(Debug, Clone, Default)]
pub struct StopRequest {
    pub task_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopResponse;

#[derive(Debug, Clone, Default)]
pub struct KillRequest {
    pub task_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillResponse;
