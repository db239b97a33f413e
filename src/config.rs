//! Environment-driven configuration for the application context.

use std::env;
use std::time::Duration;

const DEFAULT_SWEEP_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub motion: motion::Config,
    pub routing: routing::Config,
    pub guidance: guidance::Config,
    pub hazard: hazard::Config,
    /// How often stale hazards are swept from the active set.
    pub hazard_sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            motion: motion::Config::default(),
            routing: routing::Config::default(),
            guidance: guidance::Config::default(),
            hazard: hazard::Config::default(),
            hazard_sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to the
    /// component defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Env(lookup);
        let defaults = Self::default();

        let endpoint = env.string("ROUTING_ENDPOINT").unwrap_or_else(|| {
            tracing::trace!(
                "ROUTING_ENDPOINT not set, using default: {}",
                defaults.routing.endpoint
            );
            defaults.routing.endpoint.clone()
        });
        let routing = routing::Config {
            endpoint,
            request_timeout: Duration::from_millis(env.u64(
                "ROUTE_TIMEOUT_MS",
                millis(defaults.routing.request_timeout),
            )),
            cache_capacity: env.usize("ROUTE_CACHE_SIZE", defaults.routing.cache_capacity),
        };

        let motion = motion::Config {
            history_capacity: env.usize("LOCATION_HISTORY_SIZE", defaults.motion.history_capacity),
        };

        let guidance = guidance::Config {
            off_route_threshold_meters: env
                .f64("OFF_ROUTE_THRESHOLD_M", defaults.guidance.off_route_threshold_meters),
            step_advance_meters: env.f64("STEP_ADVANCE_M", defaults.guidance.step_advance_meters),
            arrival_radius_meters: env
                .f64("ARRIVAL_RADIUS_M", defaults.guidance.arrival_radius_meters),
            off_route_detection: env
                .bool("OFF_ROUTE_DETECTION", defaults.guidance.off_route_detection),
            ..defaults.guidance
        };

        let max_age = env.u64("HAZARD_MAX_AGE_MS", defaults.hazard.max_age_millis.unsigned_abs());
        let hazard = hazard::Config {
            max_age_millis: i64::try_from(max_age).unwrap_or(defaults.hazard.max_age_millis),
            ..defaults.hazard
        };

        let hazard_sweep_interval = Duration::from_millis(
            env.u64("HAZARD_SWEEP_INTERVAL_MS", millis(defaults.hazard_sweep_interval)),
        );

        Self { motion, routing, guidance, hazard, hazard_sweep_interval }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.string(key)
            .map_or(default, |value| {
                matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
            })
    }

    fn f64(&self, key: &str, default: f64) -> f64 {
        self.string(key)
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    fn u64(&self, key: &str, default: u64) -> u64 {
        self.string(key).and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
    }

    fn usize(&self, key: &str, default: usize) -> usize {
        self.string(key).and_then(|value| value.parse::<usize>().ok()).unwrap_or(default)
    }
}
