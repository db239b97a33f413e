//! # Voyage
//!
//! Application context for the navigation engine. Components are built in a
//! fixed order with their dependencies passed in explicitly:
//!
//! 1. [`MotionTracker`] turns fixes into speed and heading.
//! 2. [`RouteProvider`] computes routes against the routing service.
//! 3. [`Navigator`] drives turn-by-turn guidance along the active route.
//! 4. [`HazardEngine`] raises warnings for nearby hazards.
//!
//! Every position fix flows through motion, then guidance, then hazard
//! proximity, in arrival order.

mod client;
mod config;
pub mod logging;

use std::sync::Arc;
use std::time::Duration;

use guidance::{Navigator, TripSummary};
use hazard::{HazardEngine, HazardWarning};
use motion::MotionTracker;
use nav_core::{Clock, Error, GeoPoint, HttpRequest, PositionFix, Result, SystemClock};
use routing::{Route, RouteProvider};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use crate::client::HttpClient;
pub use crate::config::Config;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Owns every navigation component for the lifetime of the application.
pub struct AppContext<H = HttpClient, C = SystemClock>
where
    H: HttpRequest + ?Sized,
    C: Clock + ?Sized,
{
    config: Config,
    clock: Arc<C>,
    motion: Arc<MotionTracker>,
    routing: Arc<RouteProvider<H, C>>,
    guidance: Arc<Navigator<C>>,
    hazards: Arc<HazardEngine<C>>,
    shutdown: watch::Sender<bool>,
}

impl AppContext {
    /// Build a context from environment configuration with the system clock
    /// and a `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be created.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let http = Arc::new(HttpClient::new(config.routing.request_timeout)?);
        Ok(Self::new(config, http, Arc::new(SystemClock)))
    }
}

impl<H, C> AppContext<H, C>
where
    H: HttpRequest + ?Sized,
    C: Clock + ?Sized,
{
    #[must_use]
    pub fn new(config: Config, http: Arc<H>, clock: Arc<C>) -> Self {
        let motion = Arc::new(MotionTracker::new(config.motion.clone()));
        let routing =
            Arc::new(RouteProvider::new(config.routing.clone(), http, Arc::clone(&clock)));
        let guidance = Arc::new(Navigator::new(config.guidance.clone(), Arc::clone(&clock)));
        let hazards = Arc::new(HazardEngine::new(config.hazard.clone(), Arc::clone(&clock)));
        let (shutdown, _) = watch::channel(false);

        info!(endpoint = %config.routing.endpoint, "navigation engine initialised");
        Self { config, clock, motion, routing, guidance, hazards, shutdown }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn motion(&self) -> &Arc<MotionTracker> {
        &self.motion
    }

    #[must_use]
    pub const fn routing(&self) -> &Arc<RouteProvider<H, C>> {
        &self.routing
    }

    #[must_use]
    pub const fn guidance(&self) -> &Arc<Navigator<C>> {
        &self.guidance
    }

    #[must_use]
    pub const fn hazards(&self) -> &Arc<HazardEngine<C>> {
        &self.hazards
    }

    /// Process one position fix: update the motion model, advance guidance
    /// and return any hazard warnings for the new position.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` when the fix is out of range; no
    /// component state changes in that case.
    pub fn on_fix(&self, fix: PositionFix) -> Result<Vec<HazardWarning>> {
        self.motion.record_fix(fix)?;
        self.guidance.on_location_update(&fix)?;
        Ok(self.hazards.check_proximity(&fix.point))
    }

    /// Route from the current position to `to` and start guidance along the
    /// best route. A failed route computation leaves any active session as
    /// it was.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` when there is no current fix or `to`
    /// is out of range, and `Error::NoRouteFound` when routing fails.
    pub async fn set_destination(&self, to: GeoPoint) -> Result<Arc<Route>> {
        let Some(current) = self.motion.current() else {
            return Err(Error::InvalidLocation("no position fix to route from".to_string()));
        };
        let from = current.point;

        let route = self.routing.compute_route(from, to, None).await?;
        self.guidance.start(from, to, Some(Arc::clone(&route)))?;
        Ok(route)
    }

    /// End guidance, if active.
    pub fn stop_navigation(&self) -> Option<TripSummary> {
        self.guidance.stop()
    }

    /// Consume fixes in arrival order until the sender is dropped or
    /// [`Self::shutdown`] is called.
    pub async fn run(&self, mut fixes: mpsc::Receiver<PositionFix>) {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            debug!("shutdown already requested, not processing fixes");
            return;
        }
        loop {
            tokio::select! {
                fix = fixes.recv() => {
                    let Some(fix) = fix else { break };
                    if let Err(err) = self.on_fix(fix) {
                        warn!(
                            monotonic_counter.rejected_fixes = 1,
                            error = %err,
                            "position fix rejected"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("fix processing stopped");
    }

    /// Signal background tasks and [`Self::run`] to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

impl<H, C> AppContext<H, C>
where
    H: HttpRequest + ?Sized,
    C: Clock + ?Sized + 'static,
{
    /// Periodically evict stale hazards until [`Self::shutdown`] is called.
    #[must_use]
    pub fn spawn_hazard_sweep(&self) -> JoinHandle<()> {
        let hazards = Arc::clone(&self.hazards);
        let clock = Arc::clone(&self.clock);
        let mut shutdown = self.shutdown.subscribe();
        let period = self.config.hazard_sweep_interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            if *shutdown.borrow() {
                debug!("shutdown already requested, hazard sweep not started");
                return;
            }
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let expired = hazards.sweep(clock.now_millis());
                        if !expired.is_empty() {
                            debug!(count = expired.len(), "swept expired hazards");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("hazard sweep stopped");
        })
    }
}
