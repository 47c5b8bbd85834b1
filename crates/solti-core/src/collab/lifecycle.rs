use async_trait::async_trait;

use crate::{collab::TaskEvent, error::HookError};

/// Control over the running task, used when a hook's inputs change underneath it.
#[async_trait]
pub trait TaskLifecycle: Send + Sync {
    async fn restart(&self, event: TaskEvent) -> Result<(), HookError>;

    async fn signal(&self, event: TaskEvent, signal: &str) -> Result<(), HookError>;
}

/// Source of secret tokens.
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Derive a token for `task` carrying `policies`.
    async fn derive_token(&self, task: &str, policies: &[String]) -> Result<String, HookError>;

    /// Renew `token`, returning a replacement when the source rotated it.
    async fn renew_token(&self, _task: &str, _token: &str) -> Result<Option<String>, HookError> {
        Ok(None)
    }
}
