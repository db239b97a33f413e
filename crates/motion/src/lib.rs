//! # Motion
//!
//! Turns raw position fixes into a continuous motion model: current and
//! last-known position, speed, heading and a bounded fix history.

mod tracker;

pub use self::tracker::*;
