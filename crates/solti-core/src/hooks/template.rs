use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use solti_model::{ChangeMode, TaskEnv, TemplateSpec};

use super::apply_change_mode;
use crate::{
    collab::{EventSink, TaskDir, TaskEvent, TaskEventKind, TaskLifecycle},
    env::{ENV_TOKEN, EnvBuilder},
    error::HookError,
    hook::{
        PrestartHook, PrestartRequest, PrestartResponse, StopHook, StopRequest, StopResponse,
        TaskHook, UpdateHook, UpdateRequest, UpdateResponse,
    },
};

/// Renders the task's templates into its directory and re-renders them on update.
///
/// When an update changes a rendered file the template's [`ChangeMode`] is applied to the running task.
/// A restart request wins over signals; signals are delivered once each.
pub struct TemplateHook {
    templates: Vec<TemplateSpec>,
    dir: TaskDir,
    env: EnvBuilder,
    lifecycle: Arc<dyn TaskLifecycle>,
    events: Arc<dyn EventSink>,
    /// Last content written per destination.
    rendered: Mutex<HashMap<String, String>>,
    stopped: AtomicBool,
}

impl TemplateHook {
    pub fn new(
        templates: Vec<TemplateSpec>,
        dir: TaskDir,
        env: EnvBuilder,
        lifecycle: Arc<dyn TaskLifecycle>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            templates,
            dir,
            env,
            lifecycle,
            events,
            rendered: Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Render every template and keep the ones whose content differs from the last successful write.
    fn changed(&self, env: &TaskEnv, token: &str) -> Vec<(&TemplateSpec, String)> {
        let rendered = self.rendered.lock().unwrap_or_else(PoisonError::into_inner);
        self.templates
            .iter()
            .filter_map(|t| {
                let content = render(&t.data, env, token);
                (rendered.get(&t.dest) != Some(&content)).then_some((t, content))
            })
            .collect()
    }

    /// Write every changed template, remembering each one only once it is on disk.
    async fn write_all(&self, changed: &[(&TemplateSpec, String)]) -> Result<(), HookError> {
        for (template, content) in changed {
            self.write(template, content).await?;
            self.rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(template.dest.clone(), content.clone());
        }
        Ok(())
    }

    async fn write(&self, template: &TemplateSpec, content: &str) -> Result<(), HookError> {
        let path = self.dir.join(&template.dest);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        trace!(dest = %path.display(), "template rendered");
        Ok(())
    }

    async fn apply_change_modes(&self, modes: Vec<&ChangeMode>) -> Result<(), HookError> {
        const REASON: &str = "template re-rendered";

        if modes.iter().any(|m| matches!(m, ChangeMode::Restart)) {
            return apply_change_mode(
                self.lifecycle.as_ref(),
                self.events.as_ref(),
                &ChangeMode::Restart,
                REASON,
            )
            .await;
        }

        let mut signals: Vec<&str> = modes
            .iter()
            .filter_map(|m| match m {
                ChangeMode::Signal { signal } => Some(signal.as_str()),
                _ => None,
            })
            .collect();
        signals.sort_unstable();
        signals.dedup();

        for signal in signals {
            let mode = ChangeMode::Signal {
                signal: signal.to_string(),
            };
            apply_change_mode(self.lifecycle.as_ref(), self.events.as_ref(), &mode, REASON).await?;
        }
        Ok(())
    }
}

/// Substitute `${NAME}` placeholders from `env`.
///
/// `${SOLTI_TOKEN}` resolves to `token` when one is set. Unknown names render empty;
/// an unterminated `${` is copied through verbatim.
pub fn render(data: &str, env: &TaskEnv, token: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        let value = if key == ENV_TOKEN && !token.is_empty() {
            Some(token)
        } else {
            env.get(key)
        };
        out.push_str(value.unwrap_or_default());
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl TaskHook for TemplateHook {
    fn name(&self) -> &str {
        super::TEMPLATE
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
impl PrestartHook for TemplateHook {
    async fn prestart(
        &self,
        _ctx: &CancellationToken,
        req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError> {
        self.stopped.store(false, Ordering::Release);

        let changed = self.changed(&req.env, &req.secret_token);
        self.write_all(&changed).await?;

        if !changed.is_empty() {
            self.events.emit(TaskEvent::new(
                TaskEventKind::TemplateRendered,
                format!("rendered {} template(s)", changed.len()),
            ));
        }
        Ok(PrestartResponse::default())
    }
}

#[async_trait]
impl UpdateHook for TemplateHook {
    async fn update(
        &self,
        _ctx: &CancellationToken,
        req: &UpdateRequest,
    ) -> Result<UpdateResponse, HookError> {
        if self.stopped.load(Ordering::Acquire) {
            debug!(task = %req.task_name, "ignoring update for stopped templates");
            return Ok(UpdateResponse);
        }

        let env = self.env.build();
        let changed = self.changed(&env, &req.secret_token);
        if changed.is_empty() {
            return Ok(UpdateResponse);
        }

        self.write_all(&changed).await?;
        self.apply_change_modes(changed.iter().map(|(t, _)| &t.change_mode).collect())
            .await?;
        Ok(UpdateResponse)
    }
}

#[async_trait]
impl StopHook for TemplateHook {
    async fn stop(
        &self,
        _ctx: &CancellationToken,
        _req: &StopRequest,
    ) -> Result<StopResponse, HookError> {
        self.stopped.store(true, Ordering::Release);
        Ok(StopResponse)
    }
}
