//! Runs one task's hooks through a full lifecycle on this node.
//!
//! Usage: `solti-agentd [CONFIG] [TASK]`, both JSON files. Without a task file a small demo task is used.

use std::{
    collections::BTreeMap,
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use solti_core::{
    AgentConfig, EnvBuilder, FileDb, HookDeps, HookError, HookStateStore, RunnerContext,
    TaskHookRunner, build_hooks,
    collab::{FsFetcher, LogEvents, SecretClient, TaskDir, TaskEvent, TaskLifecycle, TokenHandle},
    env::ENV_TOKEN,
};
use solti_model::{AllocStatus, SecretSpec, TaskEnv, TaskSpec, TemplateSpec};
use solti_observe::{LoggerConfig, logger_init};

/// Agent config file: the engine settings plus a `logger` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DaemonConfig {
    #[serde(flatten)]
    agent: AgentConfig,
    logger: LoggerConfig,
}

impl DaemonConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Lifecycle without a process behind it; requests are only logged.
struct LogLifecycle;

#[async_trait]
impl TaskLifecycle for LogLifecycle {
    async fn restart(&self, event: TaskEvent) -> Result<(), HookError> {
        warn!(reason = %event.message, "task restart requested");
        Ok(())
    }

    async fn signal(&self, event: TaskEvent, signal: &str) -> Result<(), HookError> {
        warn!(signal, reason = %event.message, "task signal requested");
        Ok(())
    }
}

/// Issues opaque node-local tokens.
struct LocalSecrets;

#[async_trait]
impl SecretClient for LocalSecrets {
    async fn derive_token(&self, task: &str, policies: &[String]) -> Result<String, HookError> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| HookError::Secret(e.to_string()))?
            .as_nanos();
        Ok(format!("s.{task}.{}.{nanos:x}", policies.join("+")))
    }
}

fn demo_task() -> TaskSpec {
    TaskSpec::new("demo", "/bin/true")
        .with_secret(SecretSpec::new(["demo-read"]))
        .with_template(TemplateSpec::new(
            "name=${SOLTI_TASK_NAME}\ntoken=${SOLTI_TOKEN}\n",
            "local/demo.conf",
        ))
        .with_shutdown_delay_ms(100)
}

/// Resolved env with the secret token masked.
fn redacted_env(env: &TaskEnv) -> BTreeMap<String, String> {
    let mut vars = env.resolved();
    if let Some(token) = vars.get_mut(ENV_TOKEN) {
        *token = "<redacted>".to_string();
    }
    vars
}

fn load_task(path: Option<&Path>) -> anyhow::Result<TaskSpec> {
    let Some(path) = path else {
        return Ok(demo_task());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading task {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing task {}", path.display()))
}

fn runner_for(cfg: &AgentConfig, task: TaskSpec) -> anyhow::Result<TaskHookRunner> {
    // The name picks the task and state paths below.
    task.validate().context("invalid task")?;
    let task = Arc::new(task);
    let task_dir = TaskDir::new(&cfg.alloc_dir, &task.name);
    let env = EnvBuilder::for_task(&task, &task_dir);
    let token = TokenHandle::new();

    let db = FileDb::open(&cfg.state_dir)
        .with_context(|| format!("opening state dir {}", cfg.state_dir.display()))?;
    let state = HookStateStore::restore(task.name.as_str(), Arc::new(db))
        .context("restoring local state")?;

    let deps = HookDeps {
        config: Arc::new(cfg.clone()),
        task_dir: task_dir.clone(),
        env: env.clone(),
        token: token.clone(),
        fetcher: Arc::new(FsFetcher),
        lifecycle: Arc::new(LogLifecycle),
        events: Arc::new(LogEvents::new(task.name.clone())),
        secrets: cfg
            .secrets_enabled
            .then(|| Arc::new(LocalSecrets) as Arc<dyn SecretClient>),
    };
    let hooks = build_hooks(&task, &deps);

    // The demo allocation is always running.
    let (_, alloc) = watch::channel(AllocStatus::Running);
    let cx = RunnerContext {
        task,
        task_dir,
        env,
        token,
        state,
        alloc,
    };
    Ok(TaskHookRunner::new(cx, hooks))
}

async fn run(runner: &TaskHookRunner) -> anyhow::Result<()> {
    if let Err(e) = runner.prestart().await {
        if e.is_recoverable() {
            warn!(error = %e, "prestart failed, retrying once");
            runner.prestart().await.context("prestart")?;
        } else {
            return Err(e).context("prestart");
        }
    }

    info!(env = ?redacted_env(&runner.env().build()), "task env");

    runner.poststart().await.context("poststart")?;
    runner.update().await;
    runner.stop().await.context("stop")?;
    runner.cancel();
    runner.kill().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args_os().skip(1);
    let config_path = args.next();
    let task_path = args.next();

    let cfg = match &config_path {
        Some(path) => DaemonConfig::load(Path::new(path))?,
        None => DaemonConfig::default(),
    };
    logger_init(&cfg.logger)?;
    info!(alloc_dir = %cfg.agent.alloc_dir.display(), state_dir = %cfg.agent.state_dir.display(), "agent starting");

    let task = load_task(task_path.as_deref().map(Path::new))?;
    let runner = runner_for(&cfg.agent, task)?;
    info!(hooks = ?runner.hooks().names(), "running task hooks");

    if let Err(e) = run(&runner).await {
        error!(error = ?e, "task lifecycle failed");
        return Err(e);
    }

    info!(hooks = runner.state().snapshot().hooks.len(), "task lifecycle finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_config_reads_flat_agent_fields_and_logger() {
        let cfg: DaemonConfig = serde_json::from_str(
            r#"{ "allocDir": "/tmp/alloc", "logger": { "format": "json" } }"#,
        )
        .unwrap();

        assert_eq!(cfg.agent.alloc_dir, Path::new("/tmp/alloc"));
        assert_eq!(cfg.agent.state_dir, AgentConfig::default().state_dir);
        assert_eq!(cfg.logger.format, solti_observe::LoggerFormat::Json);
    }

    #[tokio::test]
    async fn demo_task_runs_and_resumes_from_state() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AgentConfig {
            alloc_dir: tmp.path().join("alloc"),
            state_dir: tmp.path().join("state"),
            secrets_enabled: true,
            ..AgentConfig::default()
        };

        let runner = runner_for(&cfg, demo_task()).unwrap();
        run(&runner).await.unwrap();

        let conf = std::fs::read_to_string(tmp.path().join("alloc/demo/local/demo.conf")).unwrap();
        assert!(conf.starts_with("name=demo\ntoken=s.demo."));

        let again = runner_for(&cfg, demo_task()).unwrap();
        assert!(again.state().get("task_dir").is_some_and(|s| s.is_done()));
    }

    #[test]
    fn logged_env_hides_the_token() {
        let env: TaskEnv = [("PORT", "8080"), (ENV_TOKEN, "s.web.secret")]
            .into_iter()
            .collect();

        let logged = redacted_env(&env);

        assert_eq!(logged["PORT"], "8080");
        assert_eq!(logged[ENV_TOKEN], "<redacted>");
    }

    #[test]
    fn task_name_cannot_escape_node_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AgentConfig {
            alloc_dir: tmp.path().join("alloc"),
            state_dir: tmp.path().join("state"),
            ..AgentConfig::default()
        };

        for name in ["../../etc", "/etc"] {
            assert!(runner_for(&cfg, TaskSpec::new(name, "/bin/true")).is_err());
        }
        assert!(!tmp.path().join("state").exists());
    }

    #[tokio::test]
    async fn secret_task_fails_prestart_without_secret_support() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AgentConfig {
            alloc_dir: tmp.path().join("alloc"),
            state_dir: tmp.path().join("state"),
            ..AgentConfig::default()
        };

        let runner = runner_for(&cfg, demo_task()).unwrap();
        assert!(run(&runner).await.is_err());
    }
}
