//! # Navigation Core
//!
//! Shared building blocks for the navigation engine: geodesy primitives,
//! the domain error type, host-provided interfaces and typed event channels.

mod error;
mod event;
mod fix;
mod geo;
mod provider;

pub use crate::error::*;
pub use crate::event::*;
pub use crate::fix::PositionFix;
pub use crate::geo::*;
pub use crate::provider::*;
