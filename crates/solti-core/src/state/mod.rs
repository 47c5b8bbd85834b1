mod db;
pub use db::{FileDb, MemDb, StateDb};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use solti_model::{HookState, LocalState};

use crate::error::PersistError;

/// Task-local hook state guarded by one read-write lock and flushed to a [`StateDb`] on change.
///
/// Readers see the in-memory map; every accepted write persists the whole map before returning.
#[derive(Clone)]
pub struct HookStateStore {
    task: Arc<str>,
    inner: Arc<RwLock<LocalState>>,
    db: Arc<dyn StateDb>,
}

impl HookStateStore {
    /// Empty state for a task that has never run on this node.
    pub fn new(task: impl Into<Arc<str>>, db: Arc<dyn StateDb>) -> Self {
        Self::with_state(task, db, LocalState::new())
    }

    /// Reload whatever the db holds for `task`; falls back to empty state.
    pub fn restore(task: impl Into<Arc<str>>, db: Arc<dyn StateDb>) -> Result<Self, PersistError> {
        let task = task.into();
        let state = db.get_task_local_state(&task)?.unwrap_or_default();
        trace!(task = %task, hooks = state.hooks.len(), "restored local state");
        Ok(Self::with_state(task, db, state))
    }

    fn with_state(task: impl Into<Arc<str>>, db: Arc<dyn StateDb>, state: LocalState) -> Self {
        Self {
            task: task.into(),
            inner: Arc::new(RwLock::new(state)),
            db,
        }
    }

    pub fn get(&self, hook: &str) -> Option<HookState> {
        self.read().hook(hook).cloned()
    }

    pub fn snapshot(&self) -> LocalState {
        self.read().clone()
    }

    /// Install `next` for `hook` unless it equals `observed`, then persist the whole map.
    ///
    /// `observed` is the state read earlier in the same pass, not the current entry: the read and this
    /// write are separate critical sections, so a concurrent writer between them may be overwritten.
    /// The persist runs inside the exclusive section, so snapshots reach the db in order, and the
    /// in-memory map only takes the new entry once the db accepted it.
    ///
    /// Returns `true` when the db was written.
    pub fn put_if_changed(
        &self,
        hook: &str,
        next: HookState,
        observed: Option<&HookState>,
    ) -> Result<bool, PersistError> {
        if observed == Some(&next) {
            return Ok(false);
        }

        let mut state = self.write();
        let mut staged = state.clone();
        staged.hooks.insert(hook.to_string(), next);
        self.db.put_task_local_state(&self.task, &staged)?;
        *state = staged;
        trace!(task = %self.task, hook, "persisted local state");
        Ok(true)
    }

    fn read(&self) -> RwLockReadGuard<'_, LocalState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
