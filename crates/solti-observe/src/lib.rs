//! Logging setup shared by solti binaries.

mod logger;
pub use logger::*;
