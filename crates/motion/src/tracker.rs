use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use nav_core::{Events, PositionFix, Result, bearing, distance};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Motion tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of fixes retained in the history.
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { history_capacity: DEFAULT_HISTORY_CAPACITY }
    }
}

/// The processed result of recording a fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionUpdate {
    pub fix: PositionFix,
    /// Speed in m/s after this fix was applied.
    pub speed_mps: f64,
    /// Heading in degrees after this fix was applied.
    pub heading_degrees: f64,
    /// Distance moved since the previous fix, in meters.
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MotionEvent {
    LocationUpdated(MotionUpdate),
}

#[derive(Debug, Default)]
struct State {
    current: Option<PositionFix>,
    last_known: Option<PositionFix>,
    speed: f64,
    heading: f64,
    history: VecDeque<PositionFix>,
}

/// Maintains the motion model derived from consecutive position fixes.
#[derive(Debug)]
pub struct MotionTracker {
    config: Config,
    state: Mutex<State>,
    events: Events<MotionEvent>,
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MotionTracker {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let history = VecDeque::with_capacity(config.history_capacity);
        Self {
            config,
            state: Mutex::new(State { history, ..State::default() }),
            events: Events::default(),
        }
    }

    /// Record a new fix, deriving speed and heading from the previous fix
    /// when the platform did not supply them.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` when the fix lies outside valid
    /// latitude/longitude bounds. The motion model is left untouched.
    pub fn record_fix(&self, fix: PositionFix) -> Result<MotionUpdate> {
        fix.point.validate()?;

        let update = {
            let mut state = self.lock();
            let mut moved = 0.0;

            if let Some(prev) = state.current {
                moved = distance(&prev.point, &fix.point);
                #[allow(clippy::cast_precision_loss)]
                let elapsed_secs = (fix.timestamp_millis - prev.timestamp_millis) as f64 / 1000.0;

                if elapsed_secs > 0.0 {
                    if fix.speed_mps.is_none() {
                        state.speed = moved / elapsed_secs;
                    }
                    // zero-distance fixes carry no direction; keep the previous heading
                    if fix.heading_degrees.is_none() && moved > 0.0 {
                        state.heading = bearing(&prev.point, &fix.point);
                    }
                } else {
                    debug!(
                        previous = prev.timestamp_millis,
                        current = fix.timestamp_millis,
                        "non-increasing fix timestamp, keeping previous speed and heading"
                    );
                }
            }

            if let Some(speed) = fix.speed_mps {
                state.speed = speed.max(0.0);
            }
            if let Some(heading) = fix.heading_degrees {
                state.heading = heading.rem_euclid(360.0);
            }

            state.last_known = state.current.replace(fix);
            state.history.push_back(fix);
            while state.history.len() > self.config.history_capacity {
                state.history.pop_front();
            }

            MotionUpdate {
                fix,
                speed_mps: state.speed,
                heading_degrees: state.heading,
                distance_meters: moved,
            }
        };

        trace!(
            lat = update.fix.point.lat,
            lng = update.fix.point.lng,
            speed = update.speed_mps,
            heading = update.heading_degrees,
            "location updated"
        );
        self.events.publish(MotionEvent::LocationUpdated(update));

        Ok(update)
    }

    /// The most recent fix.
    #[must_use]
    pub fn current(&self) -> Option<PositionFix> {
        self.lock().current
    }

    /// The fix that was current before the most recent one.
    #[must_use]
    pub fn last_known(&self) -> Option<PositionFix> {
        self.lock().last_known
    }

    /// Current speed in m/s.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.lock().speed
    }

    /// Current heading in degrees.
    #[must_use]
    pub fn heading(&self) -> f64 {
        self.lock().heading
    }

    /// Accuracy of the current fix in meters.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        self.lock().current.map(|fix| fix.accuracy_meters)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Snapshot of the retained fixes, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<PositionFix> {
        self.lock().history.iter().copied().collect()
    }

    /// Forget every fix and zero the motion model.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.history.clear();
        state.current = None;
        state.last_known = None;
        state.speed = 0.0;
        state.heading = 0.0;
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MotionEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
