//! # Geodesy
//!
//! Great-circle primitives on a spherical Earth.

use serde::{Deserialize, Serialize};

use crate::{Result, invalid_location};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a point from a GeoJSON `[lng, lat]` pair.
    #[must_use]
    pub const fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self { lat: pair[1], lng: pair[0] }
    }

    /// Whether both coordinates are finite and inside the valid range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Reject points outside the valid latitude/longitude bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` when either coordinate is out of
    /// range or not a finite number.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(invalid_location!("lat {} / lng {} is outside valid bounds", self.lat, self.lng))
        }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        distance(self, other)
    }
}

/// Haversine great-circle distance between two points, in meters.
#[must_use]
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `a` towards `b`, in degrees within `[0, 360)`.
///
/// Coincident points yield `0.0`.
#[must_use]
pub fn bearing(a: &GeoPoint, b: &GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }

    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    let degrees = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative angles
    if degrees >= 360.0 { 0.0 } else { degrees }
}

/// Smallest distance from `point` to any vertex of `polyline`.
///
/// Returns `None` for an empty polyline.
#[must_use]
pub fn nearest_vertex_distance(point: &GeoPoint, polyline: &[GeoPoint]) -> Option<f64> {
    polyline.iter().map(|vertex| distance(point, vertex)).min_by(f64::total_cmp)
}
