//! Hook capability contracts.
//!
//! Every hook implements [`TaskHook`] and opts into phases by overriding the matching `as_*` accessor.
//! Phase runners ask each hook in order whether it has the capability; a hook that returns `None` is
//! never called for that phase.

mod request;
pub use request::*;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HookError;

/// A named lifecycle hook.
pub trait TaskHook: Send + Sync {
    /// Stable name; keys the persisted hook state.
    fn name(&self) -> &str;

    fn as_prestart(&self) -> Option<&dyn PrestartHook> {
        None
    }

    fn as_poststart(&self) -> Option<&dyn PoststartHook> {
        None
    }

    fn as_update(&self) -> Option<&dyn UpdateHook> {
        None
    }

    fn as_stop(&self) -> Option<&dyn StopHook> {
        None
    }

    fn as_kill(&self) -> Option<&dyn KillHook> {
        None
    }
}

/// Runs before the task process starts. May be resumed after an agent restart.
#[async_trait]
pub trait PrestartHook: Send + Sync {
    async fn prestart(
        &self,
        ctx: &CancellationToken,
        req: &PrestartRequest,
    ) -> Result<PrestartResponse, HookError>;
}

/// Runs once the task process has started.
#[async_trait]
pub trait PoststartHook: Send + Sync {
    async fn poststart(
        &self,
        ctx: &CancellationToken,
        req: &PoststartRequest,
    ) -> Result<PoststartResponse, HookError>;
}

/// Notified when something the task depends on changed (e.g. a rotated secret token).
#[async_trait]
pub trait UpdateHook: Send + Sync {
    async fn update(
        &self,
        ctx: &CancellationToken,
        req: &UpdateRequest,
    ) -> Result<UpdateResponse, HookError>;
}

/// Runs while the task is being torn down, before it exits.
#[async_trait]
pub trait StopHook: Send + Sync {
    async fn stop(
        &self,
        ctx: &CancellationToken,
        req: &StopRequest,
    ) -> Result<StopResponse, HookError>;
}

/// Runs when the task is killed. The context passed here is never cancelled.
#[async_trait]
pub trait KillHook: Send + Sync {
    async fn kill(
        &self,
        ctx: &CancellationToken,
        req: &KillRequest,
    ) -> Result<KillResponse, HookError>;
}
