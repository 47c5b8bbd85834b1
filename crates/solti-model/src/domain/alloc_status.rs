use serde::{Deserialize, Serialize};

/// Client-side status of the allocation that owns a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocStatus {
    /// Allocation is placed but no task has started yet.
    #[default]
    Pending,
    /// At least one task is running.
    Running,
    /// All tasks exited successfully.
    Complete,
    /// A task failed and the allocation will not be restarted.
    Failed,
    /// The node lost track of the allocation.
    Lost,
}

impl AllocStatus {
    /// Returns `true` if the allocation will never run work again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AllocStatus::Complete | AllocStatus::Failed | AllocStatus::Lost
        )
    }
}
