use std::sync::Arc;

use chrono::TimeDelta;
use hazard::{
    Config, Hazard, HazardEngine, HazardEvent, HazardSource, HazardType, Priority, Urgency,
};
use nav_core::{GeoPoint, ManualClock, drain};
use pretty_assertions::assert_eq;

const T0: i64 = 1_700_000_000_000;
const ORIGIN: GeoPoint = GeoPoint::new(0.0, 0.0);

// meters due north of the origin
fn north(meters: f64) -> GeoPoint {
    GeoPoint::new(meters / 111_195.0, 0.0)
}

fn hazard(id: &str, kind: HazardType, point: GeoPoint) -> Hazard {
    Hazard {
        id: id.to_string(),
        kind,
        point,
        confidence: 0.9,
        source: HazardSource::Community,
        reported_at_millis: T0,
        processed_at_millis: 0,
        description: None,
    }
}

fn engine() -> (HazardEngine<ManualClock>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::from_millis(T0));
    (HazardEngine::new(Config::default(), Arc::clone(&clock)), clock)
}

#[test]
fn speed_camera_urgency_by_distance() {
    let (engine, _) = engine();
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));

    let far = engine.check_proximity(&north(400.0));
    assert_eq!(far.len(), 1);
    assert_eq!(far[0].urgency, Urgency::Medium);
    assert_eq!(far[0].message, "Speed camera ahead in 400m");

    let near = engine.check_proximity(&north(100.0));
    assert_eq!(near[0].urgency, Urgency::Critical);

    assert!(engine.check_proximity(&north(600.0)).is_empty());
}

#[test]
fn expiry_after_max_age() {
    let (engine, _) = engine();
    let mut events = engine.subscribe();
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));

    assert!(engine.sweep(T0 + 299_999).is_empty());
    assert_eq!(engine.check_proximity(&north(100.0)).len(), 1);

    let expired = engine.sweep(T0 + 300_001);
    assert_eq!(expired.len(), 1);
    assert!(engine.check_proximity(&north(100.0)).is_empty());
    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, HazardEvent::Expired(h) if h.id == "cam")));
}

#[test]
fn reingest_refreshes_age() {
    let (engine, clock) = engine();
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));
    clock.advance(TimeDelta::minutes(4));
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));

    assert!(engine.sweep(T0 + 300_001).is_empty());
    assert_eq!(engine.active().len(), 1);
}

#[test]
fn disabled_type_is_discarded_silently() {
    let (engine, _) = engine();
    let mut events = engine.subscribe();

    // roadwork is off by default
    assert!(!engine.ingest(hazard("works", HazardType::Roadwork, ORIGIN)));
    assert!(engine.active().is_empty());
    assert!(drain(&mut events).is_empty());

    engine.set_enabled(HazardType::Roadwork, true);
    assert!(engine.ingest(hazard("works", HazardType::Roadwork, ORIGIN)));
    assert_eq!(engine.active().len(), 1);
}

#[test]
fn report_marks_user_source() {
    let (engine, _) = engine();
    let id = engine
        .report(HazardType::PoliceReport, north(50.0), Some("checkpoint".to_string()))
        .expect("accepted");

    let active = engine.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
    assert!(id.starts_with("user_report_"));
    assert_eq!(active[0].source, HazardSource::User);
    assert!((active[0].confidence - 0.7).abs() < f64::EPSILON);
    assert_eq!(active[0].reported_at_millis, T0);

    engine.set_enabled(HazardType::Weather, false);
    assert!(engine.report(HazardType::Weather, ORIGIN, None).is_none());
}

#[test]
fn warnings_ordered_by_urgency_then_distance() {
    let (engine, _) = engine();
    engine.ingest(hazard("school", HazardType::SchoolZone, north(150.0)));
    engine.ingest(hazard("accident", HazardType::Accident, north(900.0)));
    engine.ingest(hazard("police", HazardType::PoliceReport, north(500.0)));
    engine.ingest(hazard("rail", HazardType::RailwayCrossing, north(350.0)));
    let mut events = engine.subscribe();

    let warnings = engine.check_proximity(&ORIGIN);
    let order: Vec<(&str, Urgency)> =
        warnings.iter().map(|w| (w.hazard.id.as_str(), w.urgency)).collect();

    assert_eq!(
        order,
        vec![
            ("accident", Urgency::Critical),
            ("police", Urgency::High),
            ("school", Urgency::Medium),
            ("rail", Urgency::Medium),
        ]
    );
    assert_eq!(
        drain(&mut events).iter().filter(|e| matches!(e, HazardEvent::Warning(_))).count(),
        4
    );
}

#[test]
fn invalid_point_yields_no_warnings() {
    let (engine, _) = engine();
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));
    assert!(engine.check_proximity(&GeoPoint::new(95.0, 0.0)).is_empty());
}

#[test]
fn statistics_and_clearing() {
    let (engine, _) = engine();
    engine.ingest(hazard("cam", HazardType::SpeedCamera, ORIGIN));
    engine.ingest(hazard("crash", HazardType::Accident, north(10.0)));
    engine.report(HazardType::SpeedCamera, north(20.0), None);

    let stats = engine.statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_type.get(&HazardType::SpeedCamera), Some(&2));
    assert_eq!(stats.by_priority.get(&Priority::Critical), Some(&1));
    assert_eq!(stats.by_source.get(&HazardSource::User), Some(&1));

    let mut events = engine.subscribe();
    assert!(engine.clear("cam"));
    assert!(!engine.clear("cam"));
    assert_eq!(engine.clear_all(), 2);
    assert!(engine.active().is_empty());

    let events = drain(&mut events);
    assert!(matches!(
        events.as_slice(),
        [HazardEvent::Cleared(_), HazardEvent::AllCleared { count: 2 }]
    ));
}
