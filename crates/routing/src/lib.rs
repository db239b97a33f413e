//! # Routing
//!
//! Requests candidate routes from an OSRM-compatible routing service, scores
//! and classifies them, and selects the best one. Results are held in a
//! bounded LRU cache keyed by rounded endpoints and route options.

mod cache;
mod osrm;
mod planner;
mod route;

pub use self::cache::{DEFAULT_CACHE_CAPACITY, RouteCache, cache_key};
pub use self::osrm::*;
pub use self::planner::*;
pub use self::route::*;
