//! Collaborators the engine and the built-in hooks are wired to.

mod events;
pub use events::{EventSink, LogEvents, TaskEvent, TaskEventKind};

mod fetch;
pub use fetch::{ArtifactFetcher, FsFetcher};

mod lifecycle;
pub use lifecycle::{SecretClient, TaskLifecycle};

mod task_dir;
pub use task_dir::TaskDir;

mod token;
pub use token::TokenHandle;
