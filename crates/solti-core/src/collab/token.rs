use std::sync::{Arc, PoisonError, RwLock};

/// Shared accessor for the task's secret token.
///
/// Written by the secret hook, read by the runner whenever it builds a prestart or update request.
#[derive(Clone, Debug, Default)]
pub struct TokenHandle {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, or an empty string when none was derived.
    pub fn get(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
