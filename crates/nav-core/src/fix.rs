use serde::{Deserialize, Serialize};

use crate::GeoPoint;

/// A single position report from the platform location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub point: GeoPoint,
    pub accuracy_meters: f64,
    pub timestamp_millis: i64,

    /// Ground speed in m/s, when the platform reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,

    /// Course over ground in degrees, when the platform reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_degrees: Option<f64>,
}

impl PositionFix {
    /// A fix with no platform-supplied speed or heading.
    #[must_use]
    pub const fn new(point: GeoPoint, accuracy_meters: f64, timestamp_millis: i64) -> Self {
        Self { point, accuracy_meters, timestamp_millis, speed_mps: None, heading_degrees: None }
    }

    #[must_use]
    pub const fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    #[must_use]
    pub const fn with_heading(mut self, heading_degrees: f64) -> Self {
        self.heading_degrees = Some(heading_degrees);
        self
    }
}
