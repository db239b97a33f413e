mod provider;

use std::sync::Arc;
use std::time::Duration;

use nav_core::{GeoPoint, ManualClock, drain};
use pretty_assertions::assert_eq;
use routing::{Classification, Config, RouteEvent, RouteOptions, RouteProvider, Variant};

use self::provider::{MockHttp, NO_ROUTE, Reply, SHORTEST};

const FROM: GeoPoint = GeoPoint::new(-36.8485, 174.7633);
const TO: GeoPoint = GeoPoint::new(-36.9, 174.8);

fn planner(http: &MockHttp) -> RouteProvider<MockHttp, ManualClock> {
    RouteProvider::new(
        Config { endpoint: "http://osrm.test/route/v1/driving".to_string(), ..Config::default() },
        Arc::new(http.clone()),
        Arc::new(ManualClock::from_millis(1_700_000_000_000)),
    )
}

#[tokio::test]
async fn selects_highest_score() {
    let http = MockHttp::default();
    let planner = planner(&http);

    let route = planner.compute_route(FROM, TO, None).await.expect("should compute");

    // fixtures score 40 / 85 / 60
    assert!((route.score - 85.0).abs() < f64::EPSILON);
    assert_eq!(route.variant, Variant::NoHighways);
    assert_eq!(route.name, "No Highways");
    assert_eq!(route.classification, Classification::Mixed);
    assert_eq!(http.requests().len(), 3);

    let scores: Vec<f64> = planner.available_routes().iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![40.0, 85.0, 60.0]);
    assert!(planner.current_route().is_some_and(|current| Arc::ptr_eq(&current, &route)));
}

#[tokio::test]
async fn second_call_served_from_cache() {
    let http = MockHttp::default();
    let planner = planner(&http);

    let first = planner.compute_route(FROM, TO, None).await.expect("should compute");
    // differs only below the cache key precision
    let nearby = GeoPoint::new(FROM.lat + 0.000_01, FROM.lng);
    let second = planner.compute_route(nearby, TO, None).await.expect("should compute");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(http.requests().len(), 3, "exactly one fetch batch");
    assert_eq!(planner.cached_routes(), 1);
}

#[tokio::test]
async fn different_options_miss_cache() {
    let http = MockHttp::default();
    let planner = planner(&http);

    planner.compute_route(FROM, TO, None).await.expect("should compute");
    let options = RouteOptions { avoid_ferries: true, ..RouteOptions::default() };
    planner.compute_route(FROM, TO, Some(&options)).await.expect("should compute");

    let requests = http.requests();
    assert_eq!(requests.len(), 6);
    assert!(requests[3..].iter().all(|url| url.contains("exclude=ferry")));
}

#[tokio::test]
async fn failing_variants_are_discarded() {
    let http = MockHttp::new(Reply::Status(503), Reply::Refused, Reply::Json(SHORTEST));
    let planner = planner(&http);

    let route = planner.compute_route(FROM, TO, None).await.expect("should compute");

    assert_eq!(route.variant, Variant::Shortest);
    // first surviving candidate takes the first palette slot
    assert_eq!(route.color, "#00FF88");
    assert_eq!(planner.available_routes().len(), 1);
}

#[tokio::test]
async fn empty_or_malformed_payloads_are_failures() {
    let http =
        MockHttp::new(Reply::Json(NO_ROUTE), Reply::Json(b"{\"routes\": ["), Reply::Json(SHORTEST));
    let planner = planner(&http);

    let route = planner.compute_route(FROM, TO, None).await.expect("should compute");
    assert_eq!(route.variant, Variant::Shortest);
}

#[tokio::test]
async fn all_variants_failing_keeps_previous_route() {
    let http = MockHttp::default();
    let planner = planner(&http);
    let previous = planner.compute_route(FROM, TO, None).await.expect("should compute");

    http.set_replies(Reply::Refused, Reply::Status(500), Reply::Json(NO_ROUTE));
    let mut events = planner.subscribe();
    let elsewhere = GeoPoint::new(-37.0, 175.0);
    let err = planner.compute_route(FROM, elsewhere, None).await.expect_err("should fail");

    assert_eq!(err.code(), "no_route_found");
    assert!(planner.current_route().is_some_and(|current| Arc::ptr_eq(&current, &previous)));
    assert_eq!(planner.available_routes().len(), 3);

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(RouteEvent::Calculating { .. })));
    assert!(matches!(events.last(), Some(RouteEvent::Error(_))));
}

#[tokio::test(start_paused = true)]
async fn slow_variant_times_out() {
    let http = MockHttp::new(
        Reply::Delayed(Duration::from_secs(60), provider::FASTEST),
        Reply::Json(provider::NO_HIGHWAYS),
        Reply::Json(SHORTEST),
    );
    let planner = planner(&http);

    let started = tokio::time::Instant::now();
    let route = planner.compute_route(FROM, TO, None).await.expect("should compute");

    assert_eq!(route.variant, Variant::NoHighways);
    assert_eq!(planner.available_routes().len(), 2);
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn variants_are_fetched_concurrently() {
    let delay = Duration::from_secs(8);
    let http = MockHttp::new(
        Reply::Delayed(delay, provider::FASTEST),
        Reply::Delayed(delay, provider::NO_HIGHWAYS),
        Reply::Delayed(delay, SHORTEST),
    );
    let planner = planner(&http);

    let started = tokio::time::Instant::now();
    let route = planner.compute_route(FROM, TO, None).await.expect("should compute");

    assert_eq!(route.variant, Variant::NoHighways);
    assert_eq!(planner.available_routes().len(), 3);
    assert!(started.elapsed() < Duration::from_secs(9), "{:?}", started.elapsed());
}

#[tokio::test]
async fn invalid_endpoint_is_rejected_before_fetching() {
    let http = MockHttp::default();
    let planner = planner(&http);

    let err =
        planner.compute_route(GeoPoint::new(95.0, 0.0), TO, None).await.expect_err("should fail");

    assert_eq!(err.code(), "invalid_location");
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn reselects_available_route() {
    let http = MockHttp::default();
    let planner = planner(&http);
    planner.compute_route(FROM, TO, None).await.expect("should compute");

    let fastest = Arc::clone(&planner.available_routes()[0]);
    let mut events = planner.subscribe();
    let selected = planner.select_route(&fastest.id).expect("should select");

    assert!(Arc::ptr_eq(&selected, &fastest));
    assert!(planner.current_route().is_some_and(|current| Arc::ptr_eq(&current, &fastest)));
    assert_eq!(drain(&mut events), vec![RouteEvent::Selected(fastest)]);

    let err = planner.select_route("route_0_99").expect_err("should fail");
    assert_eq!(err.code(), "route_not_found");
}

#[tokio::test]
async fn stored_options_apply_when_none_given() {
    let http = MockHttp::default();
    let planner = planner(&http);
    planner.update_options(RouteOptions { avoid_highways: true, ..RouteOptions::default() });

    planner.compute_route(FROM, TO, None).await.expect("should compute");

    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|url| url.contains("exclude=motorway")));

    planner.clear_cache();
    assert_eq!(planner.cached_routes(), 0);
}
