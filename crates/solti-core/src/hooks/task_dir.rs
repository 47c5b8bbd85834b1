use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    collab::{EventSink, TaskDir, TaskEvent, TaskEventKind},
    error::HookError,
    hook::{PrestartHook, PrestartRequest, PrestartResponse, TaskHook},
};

/// Builds the task directory tree. Must run before any hook that writes into it.
pub struct TaskDirHook {
    dir: TaskDir,
    events: Arc<dyn EventSink>,
}

impl TaskDirHook {
    pub fn new(dir: TaskDir, events: Arc<dyn EventSink>) -> Self {
        Self { dir, events }
    }
}

impl TaskHook for TaskDirHook {
    fn name(&self) -> &str {
        super::TASK_DIR
    }

    fn as_prestart(&self) -> Option<&dyn PrestartHook> {
        Some(self)
    }
}

#[async_trait]
impl PrestartHook for TaskDirHook {
    async fn prestart(
        &self,
        _ctx: &CancellationToken,
        _req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError> {
        self.events.emit(TaskEvent::new(
            TaskEventKind::TaskSetup,
            "building task directory",
        ));
        self.dir.build().await?;
        debug!(dir = %self.dir.root().display(), "task directory built");

        Ok(PrestartResponse::done(self.dir.root().display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::LogEvents;
    use solti_model::{HookState, TaskEnv, TaskSpec};

    #[tokio::test]
    async fn builds_layout_and_finishes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = TaskDir::new(tmp.path(), "web");
        let hook = TaskDirHook::new(dir.clone(), Arc::new(LogEvents::new("web")));
        let req = PrestartRequest {
            task: Arc::new(TaskSpec::new("web", "/bin/web")),
            task_dir: dir.root().to_path_buf(),
            env: TaskEnv::new(),
            secret_token: String::new(),
        };

        let resp = hook.prestart(&CancellationToken::new(), &req).await.unwrap();

        assert!(dir.local_dir().is_dir());
        assert!(dir.secrets_dir().is_dir());
        assert!(dir.tmp_dir().is_dir());
        let state = HookState::new(resp.hook_data.unwrap(), resp.done);
        assert!(state.is_done());
    }
}
