use std::{
    collections::HashMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use solti_model::LocalState;

use crate::error::PersistError;

/// Durable store for task-local state. Calls are synchronous and blocking.
pub trait StateDb: Send + Sync {
    fn get_task_local_state(&self, task: &str) -> Result<Option<LocalState>, PersistError>;

    fn put_task_local_state(&self, task: &str, state: &LocalState) -> Result<(), PersistError>;
}

/// In-memory db; state survives runner restarts but not process restarts.
#[derive(Default)]
pub struct MemDb {
    tasks: Mutex<HashMap<String, LocalState>>,
    puts: AtomicUsize,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }
}

impl StateDb for MemDb {
    fn get_task_local_state(&self, task: &str) -> Result<Option<LocalState>, PersistError> {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks.get(task).cloned())
    }

    fn put_task_local_state(&self, task: &str, state: &LocalState) -> Result<(), PersistError> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.insert(task.to_string(), state.clone());
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// One JSON document per task under a directory.
///
/// Writes go to a temporary sibling which is synced and renamed over the target,
/// so a crash leaves either the previous or the new state on disk.
pub struct FileDb {
    dir: PathBuf,
}

impl FileDb {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, task: &str) -> PathBuf {
        self.dir.join(format!("{task}.json"))
    }
}

impl StateDb for FileDb {
    fn get_task_local_state(&self, task: &str) -> Result<Option<LocalState>, PersistError> {
        let raw = match fs::read(self.path_for(task)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| PersistError::Decode(e.to_string()))
    }

    fn put_task_local_state(&self, task: &str, state: &LocalState) -> Result<(), PersistError> {
        let body =
            serde_json::to_vec_pretty(state).map_err(|e| PersistError::Encode(e.to_string()))?;

        let target = self.path_for(task);
        let tmp = self.dir.join(format!(".{task}.json.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}
