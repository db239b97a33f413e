//! # Provider
//!
//! Provider defines external interfaces the navigation components depend on.
//! The host application supplies implementations; tests supply mocks.

use std::sync::Mutex;
use std::sync::PoisonError;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use http::{Request, Response};

/// The `HttpRequest` trait defines the behavior for fetching data from an
/// external service.
#[async_trait]
pub trait HttpRequest: Send + Sync {
    /// Make an outbound HTTP request and return the raw response.
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used for replaying recorded trips
/// and for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Create a clock positioned at `millis` since the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self::new(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::from_millis(1_000);
        clock.advance(Duration::milliseconds(2_500));
        assert_eq!(clock.now_millis(), 3_500);
    }
}
