//! Composition of the per-task hook list.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::debug;

use solti_model::TaskSpec;

use crate::{
    collab::{ArtifactFetcher, EventSink, SecretClient, TaskDir, TaskLifecycle, TokenHandle},
    config::AgentConfig,
    env::EnvBuilder,
    hook::TaskHook,
    hooks::{
        ArtifactHook, SecretHook, SecretHookDeps, ShutdownDelayHook, TaskDirHook, TemplateHook,
        ValidateHook,
    },
};

/// Ordered, immutable list of hooks for one task.
#[derive(Clone)]
pub struct HookList {
    hooks: Arc<[Arc<dyn TaskHook>]>,
}

impl HookList {
    pub fn new(hooks: Vec<Arc<dyn TaskHook>>) -> Self {
        Self {
            hooks: hooks.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TaskHook>> {
        self.hooks.iter()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TaskHook>> {
        self.hooks.iter().find(|h| h.name() == name)
    }
}

impl Default for HookList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Shared collaborators the built-in hooks are constructed from.
#[derive(Clone)]
pub struct HookDeps {
    pub config: Arc<AgentConfig>,
    pub task_dir: TaskDir,
    pub env: EnvBuilder,
    pub token: TokenHandle,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub lifecycle: Arc<dyn TaskLifecycle>,
    pub events: Arc<dyn EventSink>,
    /// Absent on nodes without secret support.
    pub secrets: Option<Arc<dyn SecretClient>>,
}

/// Build the hook list for `task`.
///
/// Validation and task directory construction always come first, followed by artifacts and the
/// shutdown delay. The secret hook is appended only when the task declares a secret stanza, the
/// template hook only when it declares templates. The secret hook precedes the template hook so
/// templates render with the freshly derived token.
pub fn build_hooks(task: &TaskSpec, deps: &HookDeps) -> HookList {
    let mut hooks: Vec<Arc<dyn TaskHook>> = vec![
        Arc::new(ValidateHook::new(Arc::clone(&deps.config))),
        Arc::new(TaskDirHook::new(deps.task_dir.clone(), Arc::clone(&deps.events))),
        Arc::new(ArtifactHook::new(
            deps.task_dir.clone(),
            Arc::clone(&deps.fetcher),
            Arc::clone(&deps.events),
        )),
        Arc::new(ShutdownDelayHook::new(task.shutdown_delay())),
    ];

    if let Some(secret) = &task.secret {
        hooks.push(Arc::new(SecretHook::new(
            task.name.clone(),
            secret.clone(),
            SecretHookDeps {
                client: deps.secrets.clone(),
                dir: deps.task_dir.clone(),
                token: deps.token.clone(),
                env: deps.env.clone(),
                lifecycle: Arc::clone(&deps.lifecycle),
                events: Arc::clone(&deps.events),
            },
        )));
    }

    if !task.templates.is_empty() {
        hooks.push(Arc::new(TemplateHook::new(
            task.templates.clone(),
            deps.task_dir.clone(),
            deps.env.clone(),
            Arc::clone(&deps.lifecycle),
            Arc::clone(&deps.events),
        )));
    }

    let list = HookList::new(hooks);
    debug!(task = %task.name, hooks = ?list.names(), "built task hooks");
    list
}
