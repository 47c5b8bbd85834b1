use std::path::{Path, PathBuf};

pub const LOCAL_DIR: &str = "local";
pub const SECRETS_DIR: &str = "secrets";
pub const TMP_DIR: &str = "tmp";

/// Filesystem layout of one task: `<alloc_dir>/<task>/{local,secrets,tmp}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDir {
    root: PathBuf,
}

impl TaskDir {
    pub fn new(alloc_dir: impl AsRef<Path>, task: &str) -> Self {
        Self {
            root: alloc_dir.as_ref().join(task),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn local_dir(&self) -> PathBuf {
        self.root.join(LOCAL_DIR)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join(SECRETS_DIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    /// Resolve a path relative to the task root.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Create the directory tree. Existing directories are left as they are.
    pub async fn build(&self) -> std::io::Result<()> {
        for dir in [self.local_dir(), self.secrets_dir(), self.tmp_dir()] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}
