//! Bounded least-recently-used route cache.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nav_core::GeoPoint;

use crate::route::{Route, RouteOptions};

pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Cache key for an origin, destination and option set. Coordinates are
/// rounded to four decimal places (roughly 11 m).
#[must_use]
pub fn cache_key(from: &GeoPoint, to: &GeoPoint, options: &RouteOptions) -> String {
    format!(
        "{:.4},{:.4}-{:.4},{:.4}-{}",
        from.lat,
        from.lng,
        to.lat,
        to.lng,
        options.fingerprint()
    )
}

#[derive(Debug, Default)]
struct Entries {
    routes: HashMap<String, Arc<Route>>,
    // front is least recently used
    order: VecDeque<String>,
}

impl Entries {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }
}

#[derive(Debug)]
pub struct RouteCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl RouteCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(Entries::default()) }
    }

    /// Look up a route, marking it most recently used.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Route>> {
        let mut entries = self.lock();
        let route = entries.routes.get(key).map(Arc::clone)?;
        entries.touch(key);
        Some(route)
    }

    /// Insert a route, evicting the least recently used entry when full.
    pub fn insert(&self, key: String, route: Arc<Route>) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.lock();
        if entries.routes.insert(key.clone(), route).is_some() {
            entries.touch(&key);
            return;
        }

        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.routes.remove(&evicted);
                tracing::debug!(key = %evicted, "evicted cached route");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.routes.clear();
        entries.order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
