use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;

use solti_model::DelayMs;

use crate::error::ConfigError;

const DEFAULT_ALLOC_DIR: &str = "/var/lib/solti/alloc";
const DEFAULT_STATE_DIR: &str = "/var/lib/solti/state";
const DEFAULT_MAX_SHUTDOWN_DELAY_MS: DelayMs = 5 * 60 * 1000;

/// Node-level settings the hook engine depends on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Root under which every task directory is created.
    pub alloc_dir: PathBuf,
    /// Directory holding persisted task-local state.
    pub state_dir: PathBuf,
    /// Whether this node can derive secret tokens at all.
    pub secrets_enabled: bool,
    /// Upper bound accepted for a task's shutdown delay.
    pub max_shutdown_delay_ms: DelayMs,
}

impl AgentConfig {
    /// Load a JSON config file; missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    #[inline]
    pub fn max_shutdown_delay(&self) -> Duration {
        Duration::from_millis(self.max_shutdown_delay_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alloc_dir: PathBuf::from(DEFAULT_ALLOC_DIR),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            secrets_enabled: false,
            max_shutdown_delay_ms: DEFAULT_MAX_SHUTDOWN_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = AgentConfig::from_json("{}").unwrap();
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.max_shutdown_delay(), Duration::from_secs(300));
    }

    #[test]
    fn fields_override_defaults() {
        let cfg =
            AgentConfig::from_json(r#"{"allocDir": "/tmp/a", "secretsEnabled": true}"#).unwrap();
        assert_eq!(cfg.alloc_dir, PathBuf::from("/tmp/a"));
        assert!(cfg.secrets_enabled);
        assert_eq!(cfg.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AgentConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
