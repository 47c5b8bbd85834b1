//! Data model shared by the solti task hook engine.
//!
//! Everything in here is plain serde data: the task specification a hook runner is built from,
//! the environment accumulated while hooks run, and the per-hook state persisted across agent restarts.

mod domain;
pub use domain::*;
