//! # Route Provider
//!
//! Fans a route request out into variants against the routing service,
//! scores the survivors and keeps the best one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, anyhow};
use futures::future::join_all;
use http::header::ACCEPT;
use http::{Method, Request};
use nav_core::{Clock, Error, Events, GeoPoint, HttpRequest, Result, no_route_found};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{DEFAULT_CACHE_CAPACITY, RouteCache, cache_key};
use crate::osrm::{OsrmResponse, OsrmRoute};
use crate::route::{Route, RouteOptions, RouteType, Variant};

pub const DEFAULT_ENDPOINT: &str = "https://router.project-osrm.org/route/v1/driving";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the routing service, without a trailing slash.
    pub endpoint: String,
    /// Per-variant request timeout.
    pub request_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteEvent {
    Calculating { from: GeoPoint, to: GeoPoint },
    Calculated(Arc<Route>),
    Error(String),
    Selected(Arc<Route>),
    OptionsUpdated(RouteOptions),
    CacheCleared,
}

/// A single routing-service request for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRequest {
    pub variant: Variant,
    pub url: String,
}

/// Build the variant requests for a pair of endpoints.
///
/// With default options this yields, in order, the fastest variant with
/// alternatives, the motorway-excluding variant and the shortest variant.
#[must_use]
pub fn variant_requests(
    endpoint: &str, from: &GeoPoint, to: &GeoPoint, options: &RouteOptions,
) -> Vec<VariantRequest> {
    let base = format!(
        "{}/{},{};{},{}?overview=full&geometries=geojson&steps=true",
        endpoint.trim_end_matches('/'),
        from.lng,
        from.lat,
        to.lng,
        to.lat
    );

    let mut excluded = Vec::new();
    if options.avoid_tolls {
        excluded.push("toll");
    }
    if options.avoid_ferries {
        excluded.push("ferry");
    }
    if options.avoid_highways {
        excluded.push("motorway");
    }
    let with_exclusions = |url: String, classes: &[&str]| {
        if classes.is_empty() { url } else { format!("{url}&exclude={}", classes.join(",")) }
    };

    let mut requests = vec![VariantRequest {
        variant: Variant::Fastest,
        url: with_exclusions(format!("{base}&alternatives=true"), &excluded),
    }];

    if !options.avoid_highways {
        let mut classes = excluded.clone();
        classes.push("motorway");
        let variant =
            if options.route_type == RouteType::Scenic {
                Variant::Scenic
            } else {
                Variant::NoHighways
            };
        requests.push(VariantRequest { variant, url: with_exclusions(base.clone(), &classes) });
    }

    requests.push(VariantRequest {
        variant: Variant::Shortest,
        url: with_exclusions(base, &excluded),
    });
    requests
}

/// Pick the highest scoring candidate; the earliest wins a tie.
#[must_use]
pub fn select_best(candidates: &[Arc<Route>]) -> Option<&Arc<Route>> {
    candidates.iter().fold(None, |best: Option<&Arc<Route>>, candidate| match best {
        Some(b) if b.score >= candidate.score => Some(b),
        _ => Some(candidate),
    })
}

#[derive(Debug, Default)]
struct Selection {
    current: Option<Arc<Route>>,
    available: Vec<Arc<Route>>,
}

/// Requests, scores and caches routes.
pub struct RouteProvider<H, C>
where
    H: HttpRequest + ?Sized,
    C: Clock + ?Sized,
{
    config: Config,
    http: Arc<H>,
    clock: Arc<C>,
    cache: RouteCache,
    options: RwLock<RouteOptions>,
    selection: Mutex<Selection>,
    events: Events<RouteEvent>,
}

impl<H, C> RouteProvider<H, C>
where
    H: HttpRequest + ?Sized,
    C: Clock + ?Sized,
{
    #[must_use]
    pub fn new(config: Config, http: Arc<H>, clock: Arc<C>) -> Self {
        let cache = RouteCache::new(config.cache_capacity);
        Self {
            config,
            http,
            clock,
            cache,
            options: RwLock::new(RouteOptions::default()),
            selection: Mutex::new(Selection::default()),
            events: Events::default(),
        }
    }

    /// Compute the best route between two points.
    ///
    /// `None` options use the stored preferences (see [`Self::update_options`]).
    /// A failed computation leaves the current and available routes as they
    /// were.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLocation` for an out-of-range endpoint and
    /// `Error::NoRouteFound` when no variant produced a usable route.
    pub async fn compute_route(
        &self, from: GeoPoint, to: GeoPoint, options: Option<&RouteOptions>,
    ) -> Result<Arc<Route>> {
        from.validate()?;
        to.validate()?;

        let options = options.cloned().unwrap_or_else(|| self.options());
        let key = cache_key(&from, &to, &options);

        if let Some(route) = self.cache.get(&key) {
            info!(
                monotonic_counter.route_cache_hits = 1,
                route_id = %route.id,
                "route served from cache"
            );
            self.lock_selection().current = Some(Arc::clone(&route));
            self.events.publish(RouteEvent::Calculated(Arc::clone(&route)));
            return Ok(route);
        }
        info!(monotonic_counter.route_cache_misses = 1, "calculating route");
        self.events.publish(RouteEvent::Calculating { from, to });

        let candidates = self.fetch_candidates(&from, &to, &options).await;
        let Some(best) = select_best(&candidates).map(Arc::clone) else {
            let err = no_route_found!(
                "no route variant succeeded between {},{} and {},{}",
                from.lat,
                from.lng,
                to.lat,
                to.lng
            );
            warn!(error = %err, "route calculation failed");
            self.events.publish(RouteEvent::Error(err.to_string()));
            return Err(err);
        };

        {
            let mut selection = self.lock_selection();
            selection.current = Some(Arc::clone(&best));
            selection.available = candidates;
        }
        self.cache.insert(key, Arc::clone(&best));

        info!(route_id = %best.id, variant = %best.variant, score = best.score, "route calculated");
        self.events.publish(RouteEvent::Calculated(Arc::clone(&best)));
        Ok(best)
    }

    /// Make one of the last computed candidates the current route.
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` when `id` is not among the available
    /// routes.
    pub fn select_route(&self, id: &str) -> Result<Arc<Route>> {
        let route = {
            let mut selection = self.lock_selection();
            let route = selection
                .available
                .iter()
                .find(|r| r.id == id)
                .map(Arc::clone)
                .ok_or_else(|| {
                    Error::RouteNotFound(format!("route {id} is not an available route"))
                })?;
            selection.current = Some(Arc::clone(&route));
            route
        };

        self.events.publish(RouteEvent::Selected(Arc::clone(&route)));
        Ok(route)
    }

    #[must_use]
    pub fn current_route(&self) -> Option<Arc<Route>> {
        self.lock_selection().current.clone()
    }

    /// Candidates from the last computation that reached the network.
    #[must_use]
    pub fn available_routes(&self) -> Vec<Arc<Route>> {
        self.lock_selection().available.clone()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("route cache cleared");
        self.events.publish(RouteEvent::CacheCleared);
    }

    #[must_use]
    pub fn cached_routes(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn options(&self) -> RouteOptions {
        self.options.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update_options(&self, options: RouteOptions) {
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options.clone();
        self.events.publish(RouteEvent::OptionsUpdated(options));
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RouteEvent> {
        self.events.subscribe()
    }

    async fn fetch_candidates(
        &self, from: &GeoPoint, to: &GeoPoint, options: &RouteOptions,
    ) -> Vec<Arc<Route>> {
        let requests = variant_requests(&self.config.endpoint, from, to, options);
        let results = join_all(requests.iter().map(|request| self.fetch_variant(request))).await;

        let created_at = self.clock.now();
        requests
            .iter()
            .zip(results)
            .filter_map(|(request, raw)| raw.map(|raw| (request.variant, raw)))
            .enumerate()
            .map(|(index, (variant, raw))| {
                Arc::new(Route::from_osrm(raw, variant, index, created_at))
            })
            .collect()
    }

    async fn fetch_variant(&self, request: &VariantRequest) -> Option<OsrmRoute> {
        let timeout = self.config.request_timeout;

        match tokio::time::timeout(timeout, self.request(&request.url)).await {
            Ok(Ok(route)) => {
                debug!(variant = %request.variant, "route variant returned");
                Some(route)
            }
            Ok(Err(err)) => {
                warn!(
                    monotonic_counter.route_variant_failures = 1,
                    variant = %request.variant,
                    error = %err,
                    "route variant failed"
                );
                None
            }
            Err(_elapsed) => {
                warn!(
                    monotonic_counter.route_variant_failures = 1,
                    variant = %request.variant,
                    timeout_ms = %timeout.as_millis(),
                    "route variant timed out"
                );
                None
            }
        }
    }

    async fn request(&self, url: &str) -> anyhow::Result<OsrmRoute> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(ACCEPT, "application/json")
            .body(Vec::new())
            .context("building route request")?;

        let response = self.http.fetch(request).await.context("fetching route")?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::BadGateway(format!("routing service returned {status}")).into());
        }

        let body: OsrmResponse = serde_json::from_slice(response.body()).map_err(Error::from)?;
        let code = body.code;
        body.routes
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("routing service returned no routes (code {code})"))
    }

    fn lock_selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
