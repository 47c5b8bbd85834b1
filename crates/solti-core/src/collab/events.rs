use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEventKind {
    /// Task directory built.
    TaskSetup,
    DownloadingArtifacts,
    ArtifactDownloadFailed,
    SecretDerived,
    SecretFailed,
    TemplateRendered,
    RestartRequested,
    SignalRequested,
}

/// Human-facing record of something a hook did to the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub kind: TaskEventKind,
    pub message: String,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            TaskEventKind::ArtifactDownloadFailed | TaskEventKind::SecretFailed
        )
    }
}

/// Receiver of task events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TaskEvent);
}

/// Sink that only writes events to the log.
pub struct LogEvents {
    task: String,
}

impl LogEvents {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }
}

impl EventSink for LogEvents {
    fn emit(&self, event: TaskEvent) {
        if event.is_failure() {
            warn!(task = %self.task, kind = ?event.kind, "{}", event.message);
        } else {
            info!(task = %self.task, kind = ?event.kind, "{}", event.message);
        }
    }
}
