//! Per-task lifecycle hook engine.
//!
//! A [`TaskHookRunner`] owns the ordered list of hooks built for one task by [`build_hooks`] and drives
//! them through the prestart, poststart, update, stop and kill phases. Prestart progress is persisted
//! through a [`StateDb`] so an agent restart resumes without redoing finished one-time setup.

pub mod collab;
pub mod config;
pub mod env;
pub mod error;
pub mod hook;
pub mod hooks;
pub mod registry;
pub mod runner;
pub mod state;

pub use config::AgentConfig;
pub use env::EnvBuilder;
pub use error::{ConfigError, HookError, PersistError, PhaseError};
pub use hook::{
    KillHook, KillRequest, KillResponse, PoststartHook, PoststartRequest, PoststartResponse,
    PrestartHook, PrestartRequest, PrestartResponse, StopHook, StopRequest, StopResponse, TaskHook,
    UpdateHook, UpdateRequest, UpdateResponse,
};
pub use registry::{HookDeps, HookList, build_hooks};
pub use runner::{FailurePolicy, Phase, RunnerContext, TaskHookRunner};
pub use state::{FileDb, HookStateStore, MemDb, StateDb};
