use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{HookName, HookState};

/// Task-local state persisted by the agent, keyed by hook name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub hooks: BTreeMap<HookName, HookState>,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self, name: &str) -> Option<&HookState> {
        self.hooks.get(name)
    }

    pub fn is_done(&self, name: &str) -> bool {
        self.hook(name).is_some_and(HookState::is_done)
    }
}
