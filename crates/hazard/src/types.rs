use std::fmt;

use nav_core::GeoPoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HazardType {
    SpeedCamera,
    RedLightCamera,
    PoliceReport,
    Accident,
    Roadwork,
    RailwayCrossing,
    SchoolZone,
    HospitalZone,
    Weather,
    SteepGrade,
}

impl HazardType {
    pub const ALL: [Self; 10] = [
        Self::SpeedCamera,
        Self::RedLightCamera,
        Self::PoliceReport,
        Self::Accident,
        Self::Roadwork,
        Self::RailwayCrossing,
        Self::SchoolZone,
        Self::HospitalZone,
        Self::Weather,
        Self::SteepGrade,
    ];

    #[must_use]
    pub const fn priority(self) -> Priority {
        match self {
            Self::Accident => Priority::Critical,
            Self::RedLightCamera | Self::PoliceReport => Priority::High,
            Self::SpeedCamera
            | Self::Roadwork
            | Self::RailwayCrossing
            | Self::SchoolZone
            | Self::Weather => Priority::Medium,
            Self::HospitalZone | Self::SteepGrade => Priority::Low,
        }
    }

    /// Default distance in meters at which a hazard of this type is worth a
    /// warning.
    #[must_use]
    pub const fn warning_distance(self) -> f64 {
        match self {
            Self::SpeedCamera => 500.0,
            Self::RedLightCamera => 300.0,
            Self::RailwayCrossing => 400.0,
            Self::Roadwork => 800.0,
            Self::SchoolZone | Self::HospitalZone => 200.0,
            Self::Weather => 5_000.0,
            Self::PoliceReport | Self::Accident | Self::SteepGrade => 1_000.0,
        }
    }

    /// Warning text for a hazard `meters` away.
    #[must_use]
    pub fn message(self, meters: f64) -> String {
        #[allow(clippy::cast_possible_truncation)]
        let meters = meters.round() as i64;
        match self {
            Self::SpeedCamera => format!("Speed camera ahead in {meters}m"),
            Self::RedLightCamera => format!("Red light camera in {meters}m"),
            Self::PoliceReport => format!("Police reported ahead in {meters}m"),
            Self::Accident => format!("Accident reported ahead in {meters}m"),
            Self::Roadwork => format!("Road work ahead in {meters}m"),
            Self::RailwayCrossing => format!("Railway crossing in {meters}m"),
            Self::SchoolZone => format!("School zone ahead in {meters}m"),
            Self::HospitalZone => format!("Hospital zone ahead in {meters}m"),
            Self::Weather => format!("Weather hazard ahead in {meters}m"),
            Self::SteepGrade => format!("Steep grade ahead in {meters}m"),
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SpeedCamera => "speedCamera",
            Self::RedLightCamera => "redLightCamera",
            Self::PoliceReport => "policeReport",
            Self::Accident => "accident",
            Self::Roadwork => "roadwork",
            Self::RailwayCrossing => "railwayCrossing",
            Self::SchoolZone => "schoolZone",
            Self::HospitalZone => "hospitalZone",
            Self::Weather => "weather",
            Self::SteepGrade => "steepGrade",
        };
        f.write_str(name)
    }
}

/// Static importance of a hazard type. Ordered most important first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

/// Severity of a single warning. Ordered most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    /// Combine the type priority with how far into the warning zone the
    /// vehicle is (`distance / warning_distance`).
    #[must_use]
    pub fn assess(priority: Priority, ratio: f64) -> Self {
        if priority == Priority::Critical || ratio < 0.3 {
            Self::Critical
        } else if priority == Priority::High || ratio < 0.6 {
            Self::High
        } else if priority == Priority::Medium || ratio < 0.8 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardSource {
    Community,
    Official,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HazardType,
    pub point: GeoPoint,
    pub confidence: f64,
    pub source: HazardSource,
    pub reported_at_millis: i64,
    /// Set when the hazard enters the active set; expiry counts from here.
    #[serde(default)]
    pub processed_at_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardWarning {
    pub hazard: Hazard,
    pub distance_meters: f64,
    pub warning_distance_meters: f64,
    pub urgency: Urgency,
    pub message: String,
}

/// Per-type warning toggles, persisted by the settings collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HazardSettings {
    pub speed_cameras: bool,
    pub red_light_cameras: bool,
    pub police_reports: bool,
    pub accidents: bool,
    pub roadwork: bool,
    pub railway_crossings: bool,
    pub school_zones: bool,
    pub hospital_zones: bool,
    pub weather: bool,
    pub steep_grades: bool,
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self {
            speed_cameras: true,
            red_light_cameras: true,
            police_reports: true,
            accidents: true,
            roadwork: false,
            railway_crossings: true,
            school_zones: true,
            hospital_zones: true,
            weather: false,
            steep_grades: false,
        }
    }
}

impl HazardSettings {
    #[must_use]
    pub const fn is_enabled(&self, kind: HazardType) -> bool {
        match kind {
            HazardType::SpeedCamera => self.speed_cameras,
            HazardType::RedLightCamera => self.red_light_cameras,
            HazardType::PoliceReport => self.police_reports,
            HazardType::Accident => self.accidents,
            HazardType::Roadwork => self.roadwork,
            HazardType::RailwayCrossing => self.railway_crossings,
            HazardType::SchoolZone => self.school_zones,
            HazardType::HospitalZone => self.hospital_zones,
            HazardType::Weather => self.weather,
            HazardType::SteepGrade => self.steep_grades,
        }
    }

    pub const fn set_enabled(&mut self, kind: HazardType, enabled: bool) {
        let flag = match kind {
            HazardType::SpeedCamera => &mut self.speed_cameras,
            HazardType::RedLightCamera => &mut self.red_light_cameras,
            HazardType::PoliceReport => &mut self.police_reports,
            HazardType::Accident => &mut self.accidents,
            HazardType::Roadwork => &mut self.roadwork,
            HazardType::RailwayCrossing => &mut self.railway_crossings,
            HazardType::SchoolZone => &mut self.school_zones,
            HazardType::HospitalZone => &mut self.hospital_zones,
            HazardType::Weather => &mut self.weather,
            HazardType::SteepGrade => &mut self.steep_grades,
        };
        *flag = enabled;
    }
}
