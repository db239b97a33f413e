use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use nav_core::{Clock, Events, GeoPoint, distance};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::types::{
    Hazard, HazardSettings, HazardSource, HazardType, HazardWarning, Priority, Urgency,
};

const DEFAULT_MAX_AGE_MILLIS: i64 = 300_000;
const FALLBACK_WARNING_DISTANCE: f64 = 500.0;
const USER_REPORT_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Hazards older than this (since processing) are evicted by `sweep`.
    pub max_age_millis: i64,
    pub warning_distances: HashMap<HazardType, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_age_millis: DEFAULT_MAX_AGE_MILLIS,
            warning_distances: HazardType::ALL
                .into_iter()
                .map(|kind| (kind, kind.warning_distance()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HazardEvent {
    Detected(Hazard),
    Reported(Hazard),
    Warning(HazardWarning),
    Expired(Hazard),
    Cleared(Hazard),
    AllCleared { count: usize },
    SettingsUpdated(HazardSettings),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardStatistics {
    pub total: usize,
    pub by_type: BTreeMap<HazardType, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_source: BTreeMap<HazardSource, usize>,
}

/// Active hazard set.
///
/// Producers (`ingest`, `report`) and the proximity consumer may run
/// concurrently; the set is a sharded concurrent map.
pub struct HazardEngine<C: Clock + ?Sized> {
    config: Config,
    clock: Arc<C>,
    hazards: DashMap<String, Hazard>,
    settings: RwLock<HazardSettings>,
    events: Events<HazardEvent>,
}

impl<C: Clock + ?Sized> HazardEngine<C> {
    #[must_use]
    pub fn new(config: Config, clock: Arc<C>) -> Self {
        Self {
            config,
            clock,
            hazards: DashMap::new(),
            settings: RwLock::new(HazardSettings::default()),
            events: Events::default(),
        }
    }

    /// Add or refresh a hazard from a feed. Disabled types and hazards with
    /// invalid coordinates are dropped. Returns whether it was accepted.
    pub fn ingest(&self, mut hazard: Hazard) -> bool {
        if !self.accepts(&hazard) {
            return false;
        }

        hazard.processed_at_millis = self.clock.now_millis();
        debug!(id = %hazard.id, kind = %hazard.kind, "hazard detected");
        self.hazards.insert(hazard.id.clone(), hazard.clone());
        self.events.publish(HazardEvent::Detected(hazard));
        true
    }

    /// Add a user-submitted hazard. Returns the new hazard's id, or `None`
    /// when the type is disabled or the point is invalid.
    pub fn report(
        &self, kind: HazardType, point: GeoPoint, description: Option<String>,
    ) -> Option<String> {
        let now = self.clock.now_millis();
        let hazard = Hazard {
            id: format!("user_report_{}", Uuid::new_v4()),
            kind,
            point,
            confidence: USER_REPORT_CONFIDENCE,
            source: HazardSource::User,
            reported_at_millis: now,
            processed_at_millis: now,
            description,
        };
        if !self.accepts(&hazard) {
            return None;
        }

        info!(id = %hazard.id, kind = %kind, "hazard reported");
        self.hazards.insert(hazard.id.clone(), hazard.clone());
        let id = hazard.id.clone();
        self.events.publish(HazardEvent::Reported(hazard));
        Some(id)
    }

    /// Evict hazards processed more than the max age before `now_millis`.
    pub fn sweep(&self, now_millis: i64) -> Vec<Hazard> {
        let mut expired = Vec::new();
        self.hazards.retain(|_, hazard| {
            let stale = now_millis - hazard.processed_at_millis > self.config.max_age_millis;
            if stale {
                expired.push(hazard.clone());
            }
            !stale
        });

        for hazard in &expired {
            debug!(id = %hazard.id, kind = %hazard.kind, "hazard expired");
            self.events.publish(HazardEvent::Expired(hazard.clone()));
        }
        expired
    }

    /// Warnings for every active hazard within its type's warning distance
    /// of `point`, most urgent first, then nearest first.
    pub fn check_proximity(&self, point: &GeoPoint) -> Vec<HazardWarning> {
        if !point.is_valid() {
            warn!(lat = point.lat, lng = point.lng, "ignoring proximity check for invalid point");
            return Vec::new();
        }

        let mut warnings: Vec<HazardWarning> = self
            .hazards
            .iter()
            .filter_map(|entry| {
                let hazard = entry.value();
                let warning_distance = self.warning_distance(hazard.kind);
                let meters = distance(point, &hazard.point);
                (meters <= warning_distance).then(|| HazardWarning {
                    hazard: hazard.clone(),
                    distance_meters: meters,
                    warning_distance_meters: warning_distance,
                    urgency: Urgency::assess(hazard.kind.priority(), meters / warning_distance),
                    message: hazard.kind.message(meters),
                })
            })
            .collect();

        warnings.sort_by(|a, b| {
            a.urgency.cmp(&b.urgency).then_with(|| a.distance_meters.total_cmp(&b.distance_meters))
        });

        for warning in &warnings {
            info!(
                monotonic_counter.hazard_warnings = 1,
                kind = %warning.hazard.kind,
                urgency = ?warning.urgency,
                distance_meters = warning.distance_meters,
                "hazard warning"
            );
            self.events.publish(HazardEvent::Warning(warning.clone()));
        }
        warnings
    }

    /// Remove one hazard. Returns whether it was present.
    pub fn clear(&self, id: &str) -> bool {
        let Some((_, hazard)) = self.hazards.remove(id) else {
            return false;
        };
        self.events.publish(HazardEvent::Cleared(hazard));
        true
    }

    /// Remove every hazard, returning how many were cleared.
    pub fn clear_all(&self) -> usize {
        let count = self.hazards.len();
        self.hazards.clear();
        info!(count, "cleared hazards");
        self.events.publish(HazardEvent::AllCleared { count });
        count
    }

    #[must_use]
    pub fn active(&self) -> Vec<Hazard> {
        self.hazards.iter().map(|entry| entry.value().clone()).collect()
    }

    #[must_use]
    pub fn statistics(&self) -> HazardStatistics {
        let mut stats = HazardStatistics::default();
        for entry in &self.hazards {
            let hazard = entry.value();
            stats.total += 1;
            *stats.by_type.entry(hazard.kind).or_default() += 1;
            *stats.by_priority.entry(hazard.kind.priority()).or_default() += 1;
            *stats.by_source.entry(hazard.source).or_default() += 1;
        }
        stats
    }

    #[must_use]
    pub fn settings(&self) -> HazardSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_settings(&self, settings: HazardSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.events.publish(HazardEvent::SettingsUpdated(settings));
    }

    pub fn set_enabled(&self, kind: HazardType, enabled: bool) {
        let settings = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            settings.set_enabled(kind, enabled);
            *settings
        };
        debug!(kind = %kind, enabled, "hazard type toggled");
        self.events.publish(HazardEvent::SettingsUpdated(settings));
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HazardEvent> {
        self.events.subscribe()
    }

    fn accepts(&self, hazard: &Hazard) -> bool {
        if !self.settings().is_enabled(hazard.kind) {
            trace!(id = %hazard.id, kind = %hazard.kind, "hazard type disabled, discarding");
            return false;
        }
        if !hazard.point.is_valid() {
            warn!(
                id = %hazard.id,
                lat = hazard.point.lat,
                lng = hazard.point.lng,
                "discarding hazard with invalid location"
            );
            return false;
        }
        true
    }

    fn warning_distance(&self, kind: HazardType) -> f64 {
        self.config.warning_distances.get(&kind).copied().unwrap_or(FALLBACK_WARNING_DISTANCE)
    }
}
