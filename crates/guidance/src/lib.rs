//! # Guidance
//!
//! Drives a single navigation session along an active route: progress and
//! ETA on every fix, step advancement near step boundaries, advisory
//! off-route detection and arrival.

mod instruction;
mod navigator;

pub use self::instruction::*;
pub use self::navigator::*;
