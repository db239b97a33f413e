//! # Hazard
//!
//! Holds the set of currently active road hazards, expires stale ones and
//! turns proximity to a hazard into a prioritized warning.

mod engine;
mod types;

pub use self::engine::*;
pub use self::types::*;
