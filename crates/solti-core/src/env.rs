use std::sync::{Arc, PoisonError, RwLock};

use solti_model::{TaskEnv, TaskSpec};

use crate::collab::TaskDir;

pub const ENV_TASK_NAME: &str = "SOLTI_TASK_NAME";
pub const ENV_TASK_DIR: &str = "SOLTI_TASK_DIR";
pub const ENV_SECRETS_DIR: &str = "SOLTI_SECRETS_DIR";
pub const ENV_TOKEN: &str = "SOLTI_TOKEN";

/// Shared accumulator for the task's runtime environment.
///
/// Hooks feed entries in through [`EnvBuilder::merge`]; later entries win for the same key.
/// Cloning yields another handle to the same accumulator.
#[derive(Clone, Debug, Default)]
pub struct EnvBuilder {
    inner: Arc<RwLock<TaskEnv>>,
}

impl EnvBuilder {
    pub fn new(base: TaskEnv) -> Self {
        Self {
            inner: Arc::new(RwLock::new(base)),
        }
    }

    /// Seed with the task's own environment and the task directory locations.
    pub fn for_task(task: &TaskSpec, dir: &TaskDir) -> Self {
        let mut env = TaskEnv::new();
        env.push(ENV_TASK_NAME, task.name.as_str());
        env.push(ENV_TASK_DIR, dir.root().display().to_string());
        env.push(ENV_SECRETS_DIR, dir.secrets_dir().display().to_string());
        env.extend(&task.env);
        Self::new(env)
    }

    /// Snapshot of everything accumulated so far.
    pub fn build(&self) -> TaskEnv {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn merge(&self, entries: &TaskEnv) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(entries);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(str::to_string)
    }
}
