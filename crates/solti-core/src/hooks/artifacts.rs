use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    collab::{ArtifactFetcher, EventSink, TaskDir, TaskEvent, TaskEventKind},
    error::HookError,
    hook::{PrestartHook, PrestartRequest, PrestartResponse, TaskHook},
};

/// Fetches the task's artifacts into the task directory.
///
/// Marked done once every artifact arrived, so an agent restart does not download them again.
pub struct ArtifactHook {
    dir: TaskDir,
    fetcher: Arc<dyn ArtifactFetcher>,
    events: Arc<dyn EventSink>,
}

impl ArtifactHook {
    pub fn new(dir: TaskDir, fetcher: Arc<dyn ArtifactFetcher>, events: Arc<dyn EventSink>) -> Self {
        Self {
            dir,
            fetcher,
            events,
        }
    }
}

impl TaskHook for ArtifactHook {
    fn name(&self) -> &str {
        super::ARTIFACTS
    }

    fn as_prestart(&self) -> Option<&dyn PrestartHook> {
        Some(self)
    }
}

#[async_trait]
impl PrestartHook for ArtifactHook {
    async fn prestart(
        &self,
        ctx: &CancellationToken,
        req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError> {
        let artifacts = &req.task.artifacts;
        if artifacts.is_empty() {
            return Ok(PrestartResponse::done("0"));
        }

        self.events.emit(TaskEvent::new(
            TaskEventKind::DownloadingArtifacts,
            format!("downloading {} artifact(s)", artifacts.len()),
        ));

        for artifact in artifacts {
            let dest = self.dir.join(&artifact.dest);
            if let Err(e) = self.fetcher.fetch(ctx, artifact, &dest).await {
                self.events.emit(TaskEvent::new(
                    TaskEventKind::ArtifactDownloadFailed,
                    format!("failed to download {}: {e}", artifact.source),
                ));
                return Err(e);
            }
            debug!(source = %artifact.source, dest = %dest.display(), "artifact downloaded");
        }

        Ok(PrestartResponse::done(artifacts.len().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::FsFetcher;
    use solti_model::{ArtifactSpec, TaskEnv, TaskSpec};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TaskEvent>>);

    impl EventSink for Recorder {
        fn emit(&self, event: TaskEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn req(task: TaskSpec, dir: &TaskDir) -> PrestartRequest {
        PrestartRequest {
            task: Arc::new(task),
            task_dir: dir.root().to_path_buf(),
            env: TaskEnv::new(),
            secret_token: String::new(),
        }
    }

    #[tokio::test]
    async fn fetches_all_and_marks_done() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("app.bin");
        tokio::fs::write(&src, b"bin").await.unwrap();

        let dir = TaskDir::new(tmp.path().join("alloc"), "web");
        let events = Arc::new(Recorder::default());
        let hook = ArtifactHook::new(dir.clone(), Arc::new(FsFetcher), events.clone());

        let task = TaskSpec::new("web", "/bin/web")
            .with_artifact(ArtifactSpec::new(src.display().to_string()));
        let resp = hook
            .prestart(&CancellationToken::new(), &req(task, &dir))
            .await
            .unwrap();

        assert!(resp.done);
        assert_eq!(resp.hook_data.as_deref(), Some(&b"1"[..]));
        assert!(dir.local_dir().join("app.bin").exists());
        assert_eq!(
            events.0.lock().unwrap()[0].kind,
            TaskEventKind::DownloadingArtifacts
        );
    }

    #[tokio::test]
    async fn failure_emits_event_and_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = TaskDir::new(tmp.path(), "web");
        let events = Arc::new(Recorder::default());
        let hook = ArtifactHook::new(dir.clone(), Arc::new(FsFetcher), events.clone());

        let task = TaskSpec::new("web", "/bin/web")
            .with_artifact(ArtifactSpec::new("/no/such/file.tar"));
        let err = hook
            .prestart(&CancellationToken::new(), &req(task, &dir))
            .await
            .unwrap_err();

        assert!(matches!(err, HookError::Artifact { .. }));
        assert!(events.0.lock().unwrap().iter().any(TaskEvent::is_failure));
    }
}
