use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use nav_core::{
    Clock, Error, Events, GeoPoint, PositionFix, Result, distance, nearest_vertex_distance,
};
use routing::Route;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::instruction::Instruction;

const DEFAULT_FALLBACK_SPEED_KMH: f64 = 30.0;

/// Guidance thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Distance to a step's end point at which guidance moves to the next step.
    pub step_advance_meters: f64,
    /// Distance to the destination that counts as arrival.
    pub arrival_radius_meters: f64,
    /// Deviation from the route geometry that raises an off-route event.
    pub off_route_threshold_meters: f64,
    /// Progress at or above which a trip counts as completed.
    pub completion_percent: f64,
    /// Speed assumed for time estimates before any progress is made.
    pub fallback_speed_kmh: f64,
    pub off_route_detection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_advance_meters: 50.0,
            arrival_radius_meters: 50.0,
            off_route_threshold_meters: 100.0,
            completion_percent: 95.0,
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
            off_route_detection: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceState {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Arrived,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub step_index: usize,
    pub progress_percent: f64,
    pub distance_remaining_meters: f64,
    pub time_remaining_minutes: f64,
    pub estimated_arrival: DateTime<Utc>,
}

/// Emitted once per finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct TripSummary {
    pub route: Arc<Route>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: TimeDelta,
    pub completed: bool,
    pub reason: StopReason,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceEvent {
    Started { route: Arc<Route>, start_time: DateTime<Utc> },
    InstructionAnnounced(Instruction),
    InstructionAdvanced(Instruction),
    Progress { location: GeoPoint, progress: Progress },
    OffRoute { location: GeoPoint, deviation_meters: f64 },
    Arrived { location: GeoPoint },
    NavigationStopped(TripSummary),
}

/// Snapshot of the navigator.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceStatus {
    pub state: GuidanceState,
    pub route: Option<Arc<Route>>,
    pub progress: Option<Progress>,
}

#[derive(Debug)]
struct Session {
    route: Arc<Route>,
    destination: GeoPoint,
    start_time: DateTime<Utc>,
    progress: Progress,
}

/// Turn-by-turn guidance over one active route at a time.
///
/// All transitions happen under a single session lock so a `stop` racing a
/// location update finalizes the trip exactly once.
pub struct Navigator<C: Clock + ?Sized> {
    config: Config,
    clock: Arc<C>,
    off_route_detection: AtomicBool,
    session: Mutex<Option<Session>>,
    events: Events<GuidanceEvent>,
}

impl<C: Clock + ?Sized> Navigator<C> {
    #[must_use]
    pub fn new(mut config: Config, clock: Arc<C>) -> Self {
        if !(config.fallback_speed_kmh.is_finite() && config.fallback_speed_kmh > 0.0) {
            warn!(
                fallback_speed_kmh = config.fallback_speed_kmh,
                "fallback speed must be positive, using default"
            );
            config.fallback_speed_kmh = DEFAULT_FALLBACK_SPEED_KMH;
        }
        Self {
            off_route_detection: AtomicBool::new(config.off_route_detection),
            config,
            clock,
            session: Mutex::new(None),
            events: Events::default(),
        }
    }

    /// Begin guidance along `route`.
    ///
    /// Starting while a session is active replaces its route and keeps the
    /// original start time.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingRoute` when no route is supplied and
    /// `Error::InvalidLocation` for out-of-range endpoints.
    pub fn start(&self, from: GeoPoint, to: GeoPoint, route: Option<Arc<Route>>) -> Result<()> {
        from.validate()?;
        to.validate()?;
        let route = route.ok_or(Error::MissingRoute)?;

        let now = self.clock.now();
        let mut session = self.lock();
        let start_time = match session.as_ref() {
            Some(active) => {
                info!(
                    previous = %active.route.id,
                    route_id = %route.id,
                    "rerouting active session"
                );
                active.start_time
            }
            None => now,
        };

        let destination = route.destination().unwrap_or(to);
        let mut next = Session {
            route: Arc::clone(&route),
            destination,
            start_time,
            progress: Progress {
                step_index: 0,
                progress_percent: 0.0,
                distance_remaining_meters: route.distance_meters,
                time_remaining_minutes: 0.0,
                estimated_arrival: now,
            },
        };
        next.progress = self.measure(&next, &from, now);

        info!(route_id = %route.id, steps = route.steps().len(), "navigation started");
        self.events.publish(GuidanceEvent::Started { route: Arc::clone(&route), start_time });
        if let Some(step) = route.steps().first() {
            let instruction = Instruction::for_step(0, step);
            self.events.publish(GuidanceEvent::InstructionAnnounced(instruction));
        }

        *session = Some(next);
        Ok(())
    }

    /// Apply a position fix to the active session. Ignored when idle.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` when the fix is out of range while a
    /// session is active.
    pub fn on_location_update(&self, fix: &PositionFix) -> Result<()> {
        let mut guard = self.lock();
        let Some(session) = guard.as_mut() else {
            trace!("no active session, ignoring fix");
            return Ok(());
        };
        fix.point.validate()?;

        let now = self.clock.now();
        let location = fix.point;
        session.progress = self.measure(session, &location, now);

        self.advance_step(session, &location);

        if self.off_route_detection.load(Ordering::Relaxed)
            && let Some(deviation) = nearest_vertex_distance(&location, &session.route.geometry)
            && deviation > self.config.off_route_threshold_meters
        {
            warn!(
                monotonic_counter.off_route_events = 1,
                deviation_meters = deviation,
                route_id = %session.route.id,
                "vehicle off route"
            );
            self.events.publish(GuidanceEvent::OffRoute { location, deviation_meters: deviation });
        }

        self.events.publish(GuidanceEvent::Progress { location, progress: session.progress });

        if distance(&location, &session.destination) < self.config.arrival_radius_meters {
            info!(route_id = %session.route.id, "arrived at destination");
            self.events.publish(GuidanceEvent::Arrived { location });
            if let Some(finished) = guard.take() {
                self.finish(finished, StopReason::Arrived, now);
            }
        }

        Ok(())
    }

    /// End the active session. Returns `None` when already idle.
    pub fn stop(&self) -> Option<TripSummary> {
        let finished = self.lock().take()?;
        Some(self.finish(finished, StopReason::Cancelled, self.clock.now()))
    }

    #[must_use]
    pub fn state(&self) -> GuidanceState {
        if self.lock().is_some() { GuidanceState::Active } else { GuidanceState::Idle }
    }

    #[must_use]
    pub fn status(&self) -> GuidanceStatus {
        let session = self.lock();
        session.as_ref().map_or(
            GuidanceStatus { state: GuidanceState::Idle, route: None, progress: None },
            |s| GuidanceStatus {
                state: GuidanceState::Active,
                route: Some(Arc::clone(&s.route)),
                progress: Some(s.progress),
            },
        )
    }

    /// Instruction for the step currently being driven.
    #[must_use]
    pub fn current_instruction(&self) -> Option<Instruction> {
        let session = self.lock();
        let session = session.as_ref()?;
        let index = session.progress.step_index;
        session.route.steps().get(index).map(|step| Instruction::for_step(index, step))
    }

    /// Toggle advisory off-route events.
    pub fn set_off_route_detection(&self, enabled: bool) {
        self.off_route_detection.store(enabled, Ordering::Relaxed);
        debug!(enabled, "off-route detection toggled");
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GuidanceEvent> {
        self.events.subscribe()
    }

    fn measure(&self, session: &Session, location: &GeoPoint, now: DateTime<Utc>) -> Progress {
        let total = session.route.distance_meters;
        let remaining = distance(location, &session.destination);
        let traveled = total - remaining;

        let progress_percent =
            if total > 0.0 { (traveled / total * 100.0).clamp(0.0, 100.0) } else { 0.0 };

        #[allow(clippy::cast_precision_loss)]
        let elapsed_hours = (now - session.start_time).num_milliseconds() as f64 / 3_600_000.0;
        let average_kmh = if elapsed_hours > 0.0 { traveled / 1000.0 / elapsed_hours } else { 0.0 };
        let speed_kmh =
            if average_kmh > 0.0 { average_kmh } else { self.config.fallback_speed_kmh };
        let time_remaining_minutes = remaining / 1000.0 / speed_kmh * 60.0;

        // saturates at the latest representable instant for near-zero speeds
        #[allow(clippy::cast_possible_truncation)]
        let eta = TimeDelta::try_milliseconds((time_remaining_minutes * 60_000.0).round() as i64)
            .and_then(|remaining| now.checked_add_signed(remaining))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Progress {
            step_index: session.progress.step_index,
            progress_percent,
            distance_remaining_meters: remaining,
            time_remaining_minutes,
            estimated_arrival: eta,
        }
    }

    fn advance_step(&self, session: &mut Session, location: &GeoPoint) {
        let steps = session.route.steps();
        let index = session.progress.step_index;
        let Some(end) = steps.get(index).and_then(|step| step.end_location) else {
            return;
        };

        if distance(location, &end) < self.config.step_advance_meters && index + 1 < steps.len() {
            let next = index + 1;
            session.progress.step_index = next;
            let instruction = Instruction::for_step(next, &steps[next]);
            debug!(step = next, instruction = %instruction.text, "advanced to next step");
            self.events.publish(GuidanceEvent::InstructionAdvanced(instruction));
        }
    }

    fn finish(&self, session: Session, reason: StopReason, now: DateTime<Utc>) -> TripSummary {
        let summary = TripSummary {
            route: session.route,
            start_time: session.start_time,
            end_time: now,
            duration: now - session.start_time,
            completed: session.progress.progress_percent >= self.config.completion_percent,
            reason,
            progress_percent: session.progress.progress_percent,
        };

        info!(
            route_id = %summary.route.id,
            completed = summary.completed,
            reason = ?reason,
            duration_secs = summary.duration.num_seconds(),
            "navigation stopped"
        );
        self.events.publish(GuidanceEvent::NavigationStopped(summary.clone()));
        summary
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
