//! # Route Model
//!
//! Routes as consumed by guidance: geometry, turn-by-turn steps and the
//! derived scoring, classification and cost estimates.

use std::fmt;

use chrono::{DateTime, Utc};
use nav_core::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::osrm::{OsrmRoute, OsrmStep};

/// Display colours assigned to candidates in the order they survive.
pub const ROUTE_PALETTE: [&str; 5] = ["#00FF88", "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4"];

const FUEL_LITRES_PER_100KM: f64 = 8.0;
const FUEL_PRICE_PER_LITRE: f64 = 1.45;
const HIGHWAY_KMH: f64 = 60.0;
const CITY_KMH: f64 = 30.0;

/// Caller preferences applied when requesting variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteOptions {
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
    pub avoid_ferries: bool,
    pub route_type: RouteType,
}

impl RouteOptions {
    /// Stable textual form used in cache keys.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "tolls={}|highways={}|ferries={}|type={}",
            self.avoid_tolls, self.avoid_highways, self.avoid_ferries, self.route_type
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    #[default]
    Fastest,
    Shortest,
    Scenic,
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fastest => write!(f, "fastest"),
            Self::Shortest => write!(f, "shortest"),
            Self::Scenic => write!(f, "scenic"),
        }
    }
}

/// The variant of request a candidate route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    Fastest,
    NoHighways,
    Scenic,
    Shortest,
}

impl Variant {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fastest => "Fastest Route",
            Self::NoHighways => "No Highways",
            Self::Scenic => "Scenic Route",
            Self::Shortest => "Shortest Route",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Highway,
    City,
    Scenic,
    Mixed,
}

impl Classification {
    /// Classify by average speed, with scenic variants overriding.
    #[must_use]
    pub fn classify(variant: Variant, distance_meters: f64, duration_seconds: f64) -> Self {
        if variant == Variant::Scenic {
            return Self::Scenic;
        }
        if duration_seconds <= 0.0 {
            return Self::Mixed;
        }

        let avg_kmh = (distance_meters / 1000.0) / (duration_seconds / 3600.0);
        if avg_kmh > HIGHWAY_KMH {
            Self::Highway
        } else if avg_kmh < CITY_KMH {
            Self::City
        } else {
            Self::Mixed
        }
    }
}

/// Route quality in `[0, 100]`; shorter and quicker is better.
#[must_use]
pub fn score(distance_meters: f64, duration_seconds: f64) -> f64 {
    let time_score = (100.0 - duration_seconds / 60.0).max(0.0);
    let distance_score = (100.0 - distance_meters / 1000.0).max(0.0);
    f64::midpoint(time_score, distance_score).round()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maneuver {
    /// Maneuver type as reported by the routing service (`turn`, `depart`,
    /// `roundabout`, ...).
    pub kind: String,
    pub modifier: Option<String>,
    pub location: Option<GeoPoint>,
}

/// One turn-by-turn instruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub instruction: String,
    pub maneuver: Maneuver,
    pub name: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Where the step finishes; guidance advances once the vehicle is near it.
    pub end_location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub steps: Vec<Step>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub variant: Variant,
    /// Ordered polyline.
    pub geometry: Vec<GeoPoint>,
    pub legs: Vec<Leg>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub score: f64,
    pub classification: Classification,
    pub color: String,
    pub estimated_minutes: u64,
    pub estimated_fuel_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Build a route from a service response for the given variant.
    ///
    /// `index` is the candidate's position among the surviving variants and
    /// picks both the id suffix and the display colour.
    #[must_use]
    pub fn from_osrm(
        raw: OsrmRoute, variant: Variant, index: usize, created_at: DateTime<Utc>,
    ) -> Self {
        let geometry: Vec<GeoPoint> =
            raw.geometry.coordinates.iter().copied().map(GeoPoint::from_lng_lat).collect();
        let legs = raw
            .legs
            .into_iter()
            .map(|leg| Leg {
                steps: convert_steps(leg.steps),
                distance_meters: leg.distance,
                duration_seconds: leg.duration,
            })
            .collect();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let estimated_minutes = (raw.duration.max(0.0) / 60.0).round() as u64;
        let litres = raw.distance / 1000.0 * FUEL_LITRES_PER_100KM / 100.0;
        let estimated_fuel_cost = (litres * FUEL_PRICE_PER_LITRE * 100.0).round() / 100.0;

        Self {
            id: format!("route_{}_{index}", created_at.timestamp_millis()),
            name: variant.display_name().to_string(),
            variant,
            geometry,
            legs,
            distance_meters: raw.distance,
            duration_seconds: raw.duration,
            score: score(raw.distance, raw.duration),
            classification: Classification::classify(variant, raw.distance, raw.duration),
            color: ROUTE_PALETTE[index % ROUTE_PALETTE.len()].to_string(),
            estimated_minutes,
            estimated_fuel_cost,
            created_at,
        }
    }

    /// Turn instructions for the first leg.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        self.legs.first().map_or(&[], |leg| leg.steps.as_slice())
    }

    /// Final point of the route geometry.
    #[must_use]
    pub fn destination(&self) -> Option<GeoPoint> {
        self.geometry.last().copied()
    }
}

fn convert_steps(raw: Vec<OsrmStep>) -> Vec<Step> {
    let locations: Vec<Option<GeoPoint>> =
        raw.iter().map(|s| s.maneuver.location.map(GeoPoint::from_lng_lat)).collect();

    raw.into_iter()
        .enumerate()
        .map(|(i, step)| {
            let geometry_end = step
                .geometry
                .as_ref()
                .and_then(|g| g.coordinates.last().copied())
                .map(GeoPoint::from_lng_lat);
            let end_location = geometry_end.or_else(|| locations.get(i + 1).copied().flatten());

            let instruction = step.maneuver.instruction.clone().unwrap_or_else(|| {
                describe(&step.maneuver.kind, step.maneuver.modifier.as_deref(), &step.name)
            });

            Step {
                instruction,
                maneuver: Maneuver {
                    kind: step.maneuver.kind,
                    modifier: step.maneuver.modifier,
                    location: locations[i],
                },
                name: step.name,
                distance_meters: step.distance,
                duration_seconds: step.duration,
                end_location,
            }
        })
        .collect()
}

/// Render instruction text for services that do not supply it.
fn describe(kind: &str, modifier: Option<&str>, name: &str) -> String {
    let verb = match (kind, modifier) {
        ("arrive", _) => return "Arrive at your destination".to_string(),
        ("depart", _) => "Head out".to_string(),
        ("roundabout" | "rotary", _) => "Enter the roundabout".to_string(),
        ("merge", _) => "Merge".to_string(),
        ("fork", Some(m)) => format!("Keep {m} at the fork"),
        ("on ramp", _) => "Take the ramp".to_string(),
        ("off ramp", _) => "Take the exit".to_string(),
        ("turn" | "end of road", Some("straight")) | ("continue" | "new name", _) => {
            "Continue".to_string()
        }
        ("turn" | "end of road", Some(m)) => format!("Turn {m}"),
        ("", _) => "Continue".to_string(),
        (other, Some(m)) => format!("{} {m}", capitalize(other)),
        (other, None) => capitalize(other),
    };

    if name.is_empty() { verb } else { format!("{verb} onto {name}") }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}
