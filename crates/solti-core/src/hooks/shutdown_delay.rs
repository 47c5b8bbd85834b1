use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::HookError,
    hook::{KillHook, KillRequest, KillResponse, TaskHook},
};

/// Holds the kill phase for the task's shutdown delay so dependents can drain.
pub struct ShutdownDelayHook {
    delay: Duration,
}

impl ShutdownDelayHook {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl TaskHook for ShutdownDelayHook {
    fn name(&self) -> &str {
        super::SHUTDOWN_DELAY
    }

    fn as_kill(&self) -> Option<&dyn KillHook> {
        Some(self)
    }
}

#[async_trait]
impl KillHook for ShutdownDelayHook {
    async fn kill(
        &self,
        ctx: &CancellationToken,
        req: &KillRequest,
    ) -> Result<KillResponse, HookError> {
        if self.delay.is_zero() {
            return Ok(KillResponse);
        }

        debug!(task = %req.task_name, delay_ms = self.delay.as_millis() as u64, "waiting shutdown delay");
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(KillResponse),
            _ = ctx.cancelled() => Err(HookError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_the_delay() {
        let hook = ShutdownDelayHook::new(Duration::from_secs(5));
        let start = Instant::now();

        hook.kill(&CancellationToken::new(), &KillRequest::default())
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let hook = ShutdownDelayHook::new(Duration::ZERO);
        assert!(
            hook.kill(&CancellationToken::new(), &KillRequest::default())
                .await
                .is_ok()
        );
    }
}
