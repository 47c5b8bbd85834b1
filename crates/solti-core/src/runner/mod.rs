//! Phase runners for a single task.
//!
//! All five phases share [`TaskHookRunner::run_phase`]: walk the hook list in order, call only the hooks
//! with the phase's capability, and apply the phase's [`FailurePolicy`]. Hooks within a phase run
//! strictly one after another on the caller's task.

mod phase;
pub use phase::{FailurePolicy, Phase};


use std::{future::Future, sync::Arc, time::Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Level, enabled, error, trace, warn};

use solti_model::{AllocStatus, HookState, TaskSpec};

use crate::{
    collab::{TaskDir, TokenHandle},
    env::EnvBuilder,
    error::{HookError, PersistError, PhaseError},
    hook::{
        KillHook, KillRequest, PoststartHook, PoststartRequest, PrestartHook, PrestartRequest,
        StopHook, StopRequest, TaskHook, UpdateHook, UpdateRequest,
    },
    registry::HookList,
    state::HookStateStore,
};

/// Everything a runner shares with the task runner that owns it.
pub struct RunnerContext {
    pub task: Arc<TaskSpec>,
    pub task_dir: TaskDir,
    pub env: EnvBuilder,
    pub token: TokenHandle,
    pub state: HookStateStore,
    /// Status of the owning allocation; prestart is skipped once it is terminal.
    pub alloc: watch::Receiver<AllocStatus>,
}

/// Drives the hooks of one task through its lifecycle phases.
pub struct TaskHookRunner {
    task: Arc<TaskSpec>,
    hooks: HookList,
    task_dir: TaskDir,
    env: EnvBuilder,
    token: TokenHandle,
    state: HookStateStore,
    alloc: watch::Receiver<AllocStatus>,
    ctx: CancellationToken,
}

enum Outcome {
    Ran,
    AlreadyDone,
}

enum StepError {
    Hook(HookError),
    Persist(PersistError),
}

impl TaskHookRunner {
    pub fn new(cx: RunnerContext, hooks: HookList) -> Self {
        Self {
            task: cx.task,
            hooks,
            task_dir: cx.task_dir,
            env: cx.env,
            token: cx.token,
            state: cx.state,
            alloc: cx.alloc,
            ctx: CancellationToken::new(),
        }
    }

    pub fn hooks(&self) -> &HookList {
        &self.hooks
    }

    pub fn env(&self) -> &EnvBuilder {
        &self.env
    }

    pub fn state(&self) -> &HookStateStore {
        &self.state
    }

    /// Context handed to prestart, poststart, stop and update hooks.
    pub fn ctx(&self) -> &CancellationToken {
        &self.ctx
    }

    /// Cancel the runner's context. Kill hooks are unaffected.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Run every prestart hook that has not finished its setup yet.
    ///
    /// A hook error aborts the pass with a recoverable [`PhaseError`]; calling `prestart` again resumes
    /// from the first hook that is not done. A failure to persist hook state is not recoverable.
    pub async fn prestart(&self) -> Result<(), PhaseError> {
        if self.alloc.borrow().is_terminal() {
            trace!(task = %self.task.name, "skipping prestart hooks since allocation is terminal");
            return Ok(());
        }

        self.run_phase(Phase::Prestart, |hook| {
            let pre = hook.as_prestart()?;
            Some(self.prestart_hook(hook.name(), pre))
        })
        .await
    }

    pub async fn poststart(&self) -> Result<(), PhaseError> {
        self.run_phase(Phase::Poststart, |hook| {
            let post = hook.as_poststart()?;
            Some(self.poststart_hook(hook.name(), post))
        })
        .await
    }

    pub async fn stop(&self) -> Result<(), PhaseError> {
        self.run_phase(Phase::Stop, |hook| {
            let stop = hook.as_stop()?;
            Some(self.stop_hook(hook.name(), stop))
        })
        .await
    }

    /// Deliver an update to every update hook. Failures are logged, never returned.
    pub async fn update(&self) {
        let result = self
            .run_phase(Phase::Update, |hook| {
                let upd = hook.as_update()?;
                Some(self.update_hook(hook.name(), upd))
            })
            .await;
        if let Err(e) = result {
            error!(task = %self.task.name, error = %e, "update hooks failed");
        }
    }

    /// Run every kill hook with a fresh context, even if the runner's own context was cancelled.
    pub async fn kill(&self) {
        let ctx = CancellationToken::new();
        let result = self
            .run_phase(Phase::Kill, |hook| {
                let kill = hook.as_kill()?;
                Some(self.kill_hook(hook.name(), kill, &ctx))
            })
            .await;
        if let Err(e) = result {
            error!(task = %self.task.name, error = %e, "kill hooks failed");
        }
    }

    async fn run_phase<'a, F, Fut>(&'a self, phase: Phase, mut invoke: F) -> Result<(), PhaseError>
    where
        F: FnMut(&'a dyn TaskHook) -> Option<Fut>,
        Fut: Future<Output = Result<Outcome, StepError>>,
    {
        let _timing = Timing::start(phase, None);

        for hook in self.hooks.iter() {
            let name = hook.name();
            let Some(step) = invoke(hook.as_ref()) else {
                trace!(hook = name, "skipping non-{phase} hook");
                continue;
            };

            match step.await {
                Ok(Outcome::Ran) => {}
                Ok(Outcome::AlreadyDone) => trace!(hook = name, "skipping done {phase} hook"),
                Err(StepError::Persist(e)) => {
                    error!(hook = name, error = %e, "failed to persist state after {phase} hook");
                    return Err(PhaseError::Persist(e));
                }
                Err(StepError::Hook(source)) => match phase.policy() {
                    FailurePolicy::FailFast => {
                        warn!(hook = name, error = %source, "{phase} hook failed");
                        return Err(PhaseError::Hook {
                            phase,
                            hook: name.to_string(),
                            recoverable: phase.recoverable(),
                            source,
                        });
                    }
                    FailurePolicy::BestEffort => {
                        error!(hook = name, error = %source, "{phase} hook failed");
                    }
                },
            }
        }
        Ok(())
    }

    async fn prestart_hook(&self, name: &str, hook: &dyn PrestartHook) -> Result<Outcome, StepError> {
        let req = PrestartRequest {
            task: Arc::clone(&self.task),
            task_dir: self.task_dir.root().to_path_buf(),
            env: self.env.build(),
            secret_token: self.token.get(),
        };

        let observed = self.state.get(name);
        if observed.as_ref().is_some_and(HookState::is_done) {
            return Ok(Outcome::AlreadyDone);
        }

        let _timing = Timing::start(Phase::Prestart, Some(name));
        let resp = hook
            .prestart(&self.ctx, &req)
            .await
            .map_err(StepError::Hook)?;

        if let Some(data) = resp.hook_data {
            let next = HookState::new(data, resp.done);
            self.state
                .put_if_changed(name, next, observed.as_ref())
                .map_err(StepError::Persist)?;
        }

        if !resp.env.is_empty() {
            self.env.merge(&resp.env);
        }
        Ok(Outcome::Ran)
    }

    async fn poststart_hook(
        &self,
        name: &str,
        hook: &dyn PoststartHook,
    ) -> Result<Outcome, StepError> {
        let _timing = Timing::start(Phase::Poststart, Some(name));
        let req = PoststartRequest {
            task_name: self.task.name.clone(),
        };
        hook.poststart(&self.ctx, &req)
            .await
            .map(|_| Outcome::Ran)
            .map_err(StepError::Hook)
    }

    async fn update_hook(&self, name: &str, hook: &dyn UpdateHook) -> Result<Outcome, StepError> {
        let _timing = Timing::start(Phase::Update, Some(name));
        let req = UpdateRequest {
            task_name: self.task.name.clone(),
            secret_token: self.token.get(),
        };
        hook.update(&self.ctx, &req)
            .await
            .map(|_| Outcome::Ran)
            .map_err(StepError::Hook)
    }

    async fn stop_hook(&self, name: &str, hook: &dyn StopHook) -> Result<Outcome, StepError> {
        let _timing = Timing::start(Phase::Stop, Some(name));
        let req = StopRequest {
            task_name: self.task.name.clone(),
        };
        hook.stop(&self.ctx, &req)
            .await
            .map(|_| Outcome::Ran)
            .map_err(StepError::Hook)
    }

    async fn kill_hook(
        &self,
        name: &str,
        hook: &dyn KillHook,
        ctx: &CancellationToken,
    ) -> Result<Outcome, StepError> {
        let _timing = Timing::start(Phase::Kill, Some(name));
        let req = KillRequest {
            task_name: self.task.name.clone(),
        };
        hook.kill(ctx, &req)
            .await
            .map(|_| Outcome::Ran)
            .map_err(StepError::Hook)
    }
}

/// Emits the "running"/"finished" trace pair around a phase or a single hook.
///
/// Inert unless trace logging is enabled when it is created.
struct Timing<'a> {
    phase: Phase,
    hook: Option<&'a str>,
    start: Option<Instant>,
}

impl<'a> Timing<'a> {
    fn start(phase: Phase, hook: Option<&'a str>) -> Self {
        let start = enabled!(Level::TRACE).then(Instant::now);
        if start.is_some() {
            match hook {
                Some(hook) => trace!(hook, "running {phase} hook"),
                None => trace!("running {phase} hooks"),
            }
        }
        Self { phase, hook, start }
    }
}

impl Drop for Timing<'_> {
    fn drop(&mut self) {
        let Some(start) = self.start else {
            return;
        };
        let phase = self.phase;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match self.hook {
            Some(hook) => trace!(hook, elapsed_ms, "finished {phase} hook"),
            None => trace!(elapsed_ms, "finished {phase} hooks"),
        }
    }
}
