//! Wire types for the OSRM-compatible routing service.
//!
//! Only the fields the engine consumes are modelled; everything else in the
//! response is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsrmResponse {
    pub code: String,
    pub message: Option<String>,
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsrmRoute {
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub geometry: Geometry,
    pub legs: Vec<OsrmLeg>,
}

/// GeoJSON `LineString`, coordinates as `[lng, lat]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsrmLeg {
    pub distance: f64,
    pub duration: f64,
    pub summary: String,
    pub steps: Vec<OsrmStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsrmStep {
    pub distance: f64,
    pub duration: f64,
    pub name: String,
    pub geometry: Option<Geometry>,
    pub maneuver: OsrmManeuver,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsrmManeuver {
    #[serde(rename = "type")]
    pub kind: String,
    pub modifier: Option<String>,
    pub location: Option<[f64; 2]>,
    /// Pre-rendered instruction text, supplied by some routing backends.
    pub instruction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_route() {
        let json = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 1200.5,
                "duration": 180.0,
                "weight": 190.2,
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[174.76, -36.84], [174.77, -36.85]]
                },
                "legs": [{
                    "steps": [{
                        "distance": 1200.5,
                        "duration": 180.0,
                        "name": "Queen Street",
                        "maneuver": {
                            "type": "depart", "location": [174.76, -36.84], "bearing_after": 90
                        }
                    }]
                }]
            }]
        }"#;

        let response: OsrmResponse = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(response.code, "Ok");
        let route = &response.routes[0];
        assert_eq!(route.geometry.coordinates.len(), 2);
        assert_eq!(route.legs[0].steps[0].maneuver.kind, "depart");
        assert!(route.legs[0].steps[0].geometry.is_none());
    }

    #[test]
    fn error_payload_has_no_routes() {
        let json = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        let response: OsrmResponse = serde_json::from_str(json).expect("should deserialize");
        assert!(response.routes.is_empty());
        assert_eq!(response.message.as_deref(), Some("Impossible route between points"));
    }
}
