use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AgentConfig,
    error::HookError,
    hook::{PrestartHook, PrestartRequest, PrestartResponse, TaskHook},
};

/// Rejects tasks this node cannot run.
///
/// Runs on every prestart pass and records no state.
pub struct ValidateHook {
    config: Arc<AgentConfig>,
}

impl ValidateHook {
    pub fn new(config: Arc<AgentConfig>) -> Self {
        Self { config }
    }
}

impl TaskHook for ValidateHook {
    fn name(&self) -> &str {
        super::VALIDATE
    }

    fn as_prestart(&self) -> Option<&dyn PrestartHook> {
        Some(self)
    }
}

#[async_trait]
impl PrestartHook for ValidateHook {
    async fn prestart(
        &self,
        _ctx: &CancellationToken,
        req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError> {
        let task = &req.task;
        task.validate()?;

        if task.has_secret() && !self.config.secrets_enabled {
            return Err(HookError::Failed(
                "task requires secrets but they are disabled on this node".into(),
            ));
        }
        if task.shutdown_delay() > self.config.max_shutdown_delay() {
            return Err(HookError::Failed(format!(
                "shutdown delay {}ms exceeds node maximum {}ms",
                task.shutdown_delay_ms, self.config.max_shutdown_delay_ms
            )));
        }
        Ok(PrestartResponse::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solti_model::{SecretSpec, TaskEnv, TaskSpec};

    fn req(task: TaskSpec) -> PrestartRequest {
        PrestartRequest {
            task: Arc::new(task),
            task_dir: "/alloc/web".into(),
            env: TaskEnv::new(),
            secret_token: String::new(),
        }
    }

    async fn run(config: AgentConfig, task: TaskSpec) -> Result<PrestartResponse, HookError> {
        ValidateHook::new(Arc::new(config))
            .prestart(&CancellationToken::new(), &req(task))
            .await
    }

    #[tokio::test]
    async fn accepts_plain_task_without_state() {
        let resp = run(AgentConfig::default(), TaskSpec::new("web", "/bin/web"))
            .await
            .unwrap();
        assert!(resp.hook_data.is_none());
        assert!(!resp.done);
    }

    #[tokio::test]
    async fn rejects_structurally_invalid_task() {
        let err = run(AgentConfig::default(), TaskSpec::new("", "/bin/web"))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::InvalidTask(_)));
    }

    #[tokio::test]
    async fn rejects_secret_when_disabled() {
        let task = TaskSpec::new("web", "/bin/web").with_secret(SecretSpec::new(["db"]));
        assert!(run(AgentConfig::default(), task.clone()).await.is_err());

        let enabled = AgentConfig {
            secrets_enabled: true,
            ..Default::default()
        };
        assert!(run(enabled, task).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_excessive_shutdown_delay() {
        let config = AgentConfig {
            max_shutdown_delay_ms: 1_000,
            ..Default::default()
        };
        let task = TaskSpec::new("web", "/bin/web").with_shutdown_delay_ms(2_000);
        assert!(run(config, task).await.is_err());
    }
}
