use serde::{Deserialize, Serialize};

/// Boolean switch with an explicit name at call sites.
///
/// Serialized as a plain JSON boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(bool);

impl Flag {
    #[inline]
    pub const fn enabled() -> Self {
        Flag(true)
    }

    #[inline]
    pub const fn disabled() -> Self {
        Flag(false)
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.0
    }
}

impl From<bool> for Flag {
    fn from(v: bool) -> Self {
        Flag(v)
    }
}
