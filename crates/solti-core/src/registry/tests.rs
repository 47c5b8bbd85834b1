use std::sync::Arc;

use async_trait::async_trait;

use solti_model::{SecretSpec, TaskSpec, TemplateSpec};

use super::*;
use crate::{
    collab::{FsFetcher, LogEvents, TaskEvent},
    error::HookError,
    hooks,
};

struct NoLifecycle;

#[async_trait]
impl TaskLifecycle for NoLifecycle {
    async fn restart(&self, _event: TaskEvent) -> Result<(), HookError> {
        Ok(())
    }

    async fn signal(&self, _event: TaskEvent, _signal: &str) -> Result<(), HookError> {
        Ok(())
    }
}

fn deps(task: &TaskSpec) -> HookDeps {
    let task_dir = TaskDir::new("/alloc", &task.name);
    HookDeps {
        config: Arc::new(AgentConfig::default()),
        env: EnvBuilder::for_task(task, &task_dir),
        task_dir,
        token: TokenHandle::new(),
        fetcher: Arc::new(FsFetcher),
        lifecycle: Arc::new(NoLifecycle),
        events: Arc::new(LogEvents::new(task.name.clone())),
        secrets: None,
    }
}

fn build(task: &TaskSpec) -> HookList {
    build_hooks(task, &deps(task))
}

#[test]
fn plain_task_gets_the_fixed_hooks_in_order() {
    let task = TaskSpec::new("web", "/bin/web");

    let list = build(&task);

    assert_eq!(
        list.names(),
        vec![
            hooks::VALIDATE,
            hooks::TASK_DIR,
            hooks::ARTIFACTS,
            hooks::SHUTDOWN_DELAY
        ]
    );
}

#[test]
fn templates_add_one_template_hook() {
    let task = TaskSpec::new("web", "/bin/web")
        .with_template(TemplateSpec::new("a", "local/a"))
        .with_template(TemplateSpec::new("b", "local/b"));

    let list = build(&task);

    assert_eq!(list.len(), 5);
    let template = list.get(hooks::TEMPLATE).unwrap();
    assert!(template.as_prestart().is_some());
    assert!(template.as_update().is_some());
    assert!(template.as_stop().is_some());
    assert!(template.as_kill().is_none());
}

#[test]
fn secret_precedes_template() {
    let task = TaskSpec::new("web", "/bin/web")
        .with_template(TemplateSpec::new("${SOLTI_TOKEN}", "secrets/t"))
        .with_secret(SecretSpec::new(["web-read"]));

    let list = build(&task);
    let names = list.names();

    let secret = names.iter().position(|n| *n == hooks::SECRET).unwrap();
    let template = names.iter().position(|n| *n == hooks::TEMPLATE).unwrap();
    assert!(secret < template);
    assert_eq!(names.len(), 6);
}

#[test]
fn capabilities_of_fixed_hooks() {
    let list = build(&TaskSpec::new("web", "/bin/web"));

    let delay = list.get(hooks::SHUTDOWN_DELAY).unwrap();
    assert!(delay.as_kill().is_some());
    assert!(delay.as_prestart().is_none());
    assert!(delay.as_update().is_none());

    for name in [hooks::VALIDATE, hooks::TASK_DIR, hooks::ARTIFACTS] {
        let hook = list.get(name).unwrap();
        assert!(hook.as_prestart().is_some(), "{name} must be a prestart hook");
        assert!(hook.as_kill().is_none(), "{name} must not be a kill hook");
    }
}

#[test]
fn hook_list_clones_share_hooks() {
    let list = build(&TaskSpec::new("web", "/bin/web"));
    let copy = list.clone();

    for (a, b) in list.iter().zip(copy.iter()) {
        assert!(Arc::ptr_eq(a, b));
    }
    assert!(HookList::default().is_empty());
}
