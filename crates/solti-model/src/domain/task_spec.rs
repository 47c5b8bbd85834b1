use std::{
    path::{Component, Path},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ChangeMode, DelayMs, Flag, TaskEnv};

/// Structural problems detected in a [`TaskSpec`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("task name is empty")]
    EmptyName,
    #[error("task name {0:?} must be a single path segment")]
    InvalidName(String),
    #[error("task command is empty")]
    EmptyCommand,
    #[error("invalid environment variable name: {0:?}")]
    InvalidEnvKey(String),
    #[error("destination {0:?} escapes the task directory")]
    EscapesTaskDir(String),
    #[error("secret stanza declares no policies")]
    NoSecretPolicies,
}

/// Immutable description of a single task, as scheduled onto this node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    /// Task name, unique inside its allocation.
    pub name: String,
    /// Program to execute.
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment declared by the task itself.
    #[serde(default, skip_serializing_if = "TaskEnv::is_empty")]
    pub env: TaskEnv,
    /// Secret management stanza; the secret hook only exists when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretSpec>,
    /// Templates rendered into the task directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateSpec>,
    /// Artifacts fetched into the task directory before start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactSpec>,
    /// Delay between deregistration and the kill signal.
    #[serde(default)]
    pub shutdown_delay_ms: DelayMs,
}

/// Secret-token requirement of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {
    /// Policies the derived token must carry.
    pub policies: Vec<String>,
    /// Expose the token to the task as `SOLTI_TOKEN`.
    #[serde(default = "Flag::enabled")]
    pub env: Flag,
    #[serde(default)]
    pub change_mode: ChangeMode,
}

/// Template rendered into the task directory.
///
/// `data` may reference `${NAME}` placeholders which are resolved from the task environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    pub data: String,
    /// Destination, relative to the task directory.
    pub dest: String,
    #[serde(default)]
    pub change_mode: ChangeMode,
}

/// Remote or local file fetched before the task starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSpec {
    pub source: String,
    /// Destination directory, relative to the task directory.
    #[serde(default = "default_artifact_dest")]
    pub dest: String,
}

fn default_artifact_dest() -> String {
    "local".to_string()
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: SecretSpec) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn with_template(mut self, template: TemplateSpec) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_artifact(mut self, artifact: ArtifactSpec) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_shutdown_delay_ms(mut self, delay_ms: DelayMs) -> Self {
        self.shutdown_delay_ms = delay_ms;
        self
    }

    #[inline]
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    #[inline]
    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_millis(self.shutdown_delay_ms)
    }

    /// Check the spec for problems that make it impossible to run, independent of the node it lands on.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::EmptyName);
        }
        if !is_single_segment(&self.name) {
            return Err(SpecError::InvalidName(self.name.clone()));
        }
        if self.command.trim().is_empty() {
            return Err(SpecError::EmptyCommand);
        }
        if let Some(kv) = self.env.iter().find(|kv| !valid_env_key(kv.key())) {
            return Err(SpecError::InvalidEnvKey(kv.key().to_string()));
        }
        if let Some(secret) = &self.secret
            && secret.policies.is_empty()
        {
            return Err(SpecError::NoSecretPolicies);
        }

        let dests = self
            .templates
            .iter()
            .map(|t| t.dest.as_str())
            .chain(self.artifacts.iter().map(|a| a.dest.as_str()));
        for dest in dests {
            if !is_confined(dest) {
                return Err(SpecError::EscapesTaskDir(dest.to_string()));
            }
        }
        Ok(())
    }
}

impl SecretSpec {
    pub fn new<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policies: policies.into_iter().map(Into::into).collect(),
            env: Flag::enabled(),
            change_mode: ChangeMode::default(),
        }
    }
}

impl TemplateSpec {
    pub fn new(data: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            dest: dest.into(),
            change_mode: ChangeMode::default(),
        }
    }

    pub fn with_change_mode(mut self, mode: ChangeMode) -> Self {
        self.change_mode = mode;
        self
    }
}

impl ArtifactSpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: default_artifact_dest(),
        }
    }
}

fn valid_env_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0'])
}

fn is_confined(dest: &str) -> bool {
    let path = Path::new(dest);
    !dest.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// The name is joined onto the alloc and state dirs, so it must not traverse them.
fn is_single_segment(name: &str) -> bool {
    let mut parts = Path::new(name).components();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TaskSpec {
        TaskSpec::new("web", "/bin/server")
    }

    #[test]
    fn minimal_spec_is_valid() {
        assert_eq!(spec().validate(), Ok(()));
        assert!(!spec().has_secret());
        assert_eq!(spec().shutdown_delay(), Duration::ZERO);
    }

    #[test]
    fn empty_name_and_command_rejected() {
        assert_eq!(
            TaskSpec::new(" ", "/bin/true").validate(),
            Err(SpecError::EmptyName)
        );
        assert_eq!(
            TaskSpec::new("web", "").validate(),
            Err(SpecError::EmptyCommand)
        );
    }

    #[test]
    fn name_must_not_leave_its_directory() {
        for name in ["../../etc", "/etc", "a/b", "..", ".", "web/"] {
            assert_eq!(
                TaskSpec::new(name, "/bin/true").validate(),
                Err(SpecError::InvalidName(name.into())),
                "{name}"
            );
        }
        assert_eq!(TaskSpec::new("web-1.api", "/bin/true").validate(), Ok(()));
    }

    #[test]
    fn bad_env_key_rejected() {
        let mut s = spec();
        s.env.push("A=B", "x");
        assert_eq!(s.validate(), Err(SpecError::InvalidEnvKey("A=B".into())));
    }

    #[test]
    fn template_dest_must_stay_inside_task_dir() {
        let s = spec().with_template(TemplateSpec::new("x", "../etc/passwd"));
        assert_eq!(
            s.validate(),
            Err(SpecError::EscapesTaskDir("../etc/passwd".into()))
        );

        let s = spec().with_template(TemplateSpec::new("x", "/abs/path"));
        assert!(matches!(s.validate(), Err(SpecError::EscapesTaskDir(_))));

        let s = spec().with_template(TemplateSpec::new("x", "local/app.conf"));
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn secret_without_policies_rejected() {
        let s = spec().with_secret(SecretSpec::new(Vec::<String>::new()));
        assert_eq!(s.validate(), Err(SpecError::NoSecretPolicies));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{
            "name": "api",
            "command": "/bin/api",
            "secret": { "policies": ["db"] },
            "artifacts": [{ "source": "/tmp/bundle.tar" }],
            "templates": [{ "data": "x", "dest": "local/x", "changeMode": { "mode": "signal", "signal": "SIGHUP" } }]
        }"#;
        let s: TaskSpec = serde_json::from_str(json).unwrap();

        let secret = s.secret.as_ref().unwrap();
        assert!(secret.env.is_enabled());
        assert_eq!(secret.change_mode, ChangeMode::Restart);
        assert_eq!(s.artifacts[0].dest, "local");
        assert_eq!(
            s.templates[0].change_mode,
            ChangeMode::Signal {
                signal: "SIGHUP".into()
            }
        );
        assert_eq!(s.shutdown_delay_ms, 0);
    }
}
