use std::{io::ErrorKind, path::Path, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use solti_model::{SecretSpec, TaskEnv};

use super::apply_change_mode;
use crate::{
    collab::{
        EventSink, SecretClient, TaskDir, TaskEvent, TaskEventKind, TaskLifecycle, TokenHandle,
    },
    env::{ENV_TOKEN, EnvBuilder},
    error::HookError,
    hook::{
        PrestartHook, PrestartRequest, PrestartResponse, StopHook, StopRequest, StopResponse,
        TaskHook, UpdateHook, UpdateRequest, UpdateResponse,
    },
};

/// File in the secrets directory holding the task's token.
pub const TOKEN_FILE: &str = "solti_token";

/// Derives the task's secret token and publishes it to the runner and the task.
///
/// Never reports done: every pass re-publishes the token, reusing the token file when a previous
/// run already wrote one. On update the token is renewed; a rotated token is written out, published,
/// and the stanza's change mode is applied to the task.
pub struct SecretHook {
    task: String,
    spec: SecretSpec,
    client: Option<Arc<dyn SecretClient>>,
    dir: TaskDir,
    token: TokenHandle,
    env: EnvBuilder,
    lifecycle: Arc<dyn TaskLifecycle>,
    events: Arc<dyn EventSink>,
}

/// Collaborators of a [`SecretHook`] besides the stanza itself.
pub struct SecretHookDeps {
    pub client: Option<Arc<dyn SecretClient>>,
    pub dir: TaskDir,
    pub token: TokenHandle,
    pub env: EnvBuilder,
    pub lifecycle: Arc<dyn TaskLifecycle>,
    pub events: Arc<dyn EventSink>,
}

impl SecretHook {
    pub fn new(task: String, spec: SecretSpec, deps: SecretHookDeps) -> Self {
        Self {
            task,
            spec,
            client: deps.client,
            dir: deps.dir,
            token: deps.token,
            env: deps.env,
            lifecycle: deps.lifecycle,
            events: deps.events,
        }
    }

    async fn store(&self, path: &Path, token: &str) -> Result<(), HookError> {
        tokio::fs::create_dir_all(self.dir.secrets_dir()).await?;
        tokio::fs::write(path, token).await?;
        Ok(())
    }

    fn fail(&self, what: &str, e: &HookError) {
        self.events.emit(TaskEvent::new(
            TaskEventKind::SecretFailed,
            format!("failed to {what} token: {e}"),
        ));
    }

    async fn derive(&self, ctx: &CancellationToken, path: &Path) -> Result<String, HookError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| HookError::Secret("no secret client configured".into()))?;

        let derived = tokio::select! {
            res = client.derive_token(&self.task, &self.spec.policies) => res,
            _ = ctx.cancelled() => Err(HookError::Cancelled),
        };
        let token = derived.inspect_err(|e| self.fail("derive", e))?;

        self.store(path, &token).await?;
        self.events.emit(TaskEvent::new(
            TaskEventKind::SecretDerived,
            "secret token derived",
        ));
        Ok(token)
    }
}

async fn recover(path: &Path) -> Result<Option<String>, HookError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(raw.trim().to_string())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl TaskHook for SecretHook {
    fn name(&self) -> &str {
        super::SECRET
    }

    fn as_prestart(&self) -> Option<&dyn PrestartHook> {
        Some(self)
    }

    fn as_update(&self) -> Option<&dyn UpdateHook> {
        Some(self)
    }

    fn as_stop(&self) -> Option<&dyn StopHook> {
        Some(self)
    }
}

#[async_trait]
impl PrestartHook for SecretHook {
    async fn prestart(
        &self,
        ctx: &CancellationToken,
        _req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError> {
        if ctx.is_cancelled() {
            return Err(HookError::Cancelled);
        }

        let path = self.dir.secrets_dir().join(TOKEN_FILE);
        let token = match recover(&path).await? {
            Some(token) => {
                debug!(task = %self.task, "recovered secret token from task directory");
                token
            }
            None => self.derive(ctx, &path).await?,
        };
        self.token.set(token.as_str());

        let env = if self.spec.env.is_enabled() {
            TaskEnv::single(ENV_TOKEN, token)
        } else {
            TaskEnv::new()
        };
        Ok(PrestartResponse::default().with_env(env))
    }
}

#[async_trait]
impl UpdateHook for SecretHook {
    async fn update(
        &self,
        ctx: &CancellationToken,
        _req: &UpdateRequest,
    ) -> Result<UpdateResponse, HookError> {
        let current = self.token.get();
        // Nothing to renew before prestart or after stop.
        if current.is_empty() {
            return Ok(UpdateResponse);
        }
        let Some(client) = self.client.as_ref() else {
            return Ok(UpdateResponse);
        };

        let renewed = tokio::select! {
            res = client.renew_token(&self.task, &current) => res,
            _ = ctx.cancelled() => Err(HookError::Cancelled),
        };
        let next = match renewed.inspect_err(|e| self.fail("renew", e))? {
            Some(next) if next != current => next,
            _ => return Ok(UpdateResponse),
        };

        self.store(&self.dir.secrets_dir().join(TOKEN_FILE), &next).await?;
        self.token.set(next.as_str());
        if self.spec.env.is_enabled() {
            self.env.merge(&TaskEnv::single(ENV_TOKEN, next));
        }
        self.events.emit(TaskEvent::new(
            TaskEventKind::SecretDerived,
            "secret token rotated",
        ));

        apply_change_mode(
            self.lifecycle.as_ref(),
            self.events.as_ref(),
            &self.spec.change_mode,
            "secret token rotated",
        )
        .await?;
        Ok(UpdateResponse)
    }
}

#[async_trait]
impl StopHook for SecretHook {
    async fn stop(
        &self,
        _ctx: &CancellationToken,
        _req: &StopRequest,
    ) -> Result<StopResponse, HookError> {
        self.token.clear();
        debug!(task = %self.task, "secret token released");
        Ok(StopResponse)
    }
}
