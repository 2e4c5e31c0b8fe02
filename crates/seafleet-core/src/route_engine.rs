//! Sea route engine.
//!
//! Reconciles three route sources into one path:
//! 1. the external maritime-routing provider (optional, unreliable),
//! 2. the static waypoint network (fallback, always available),
//! 3. hybrid correction, splicing network nodes into provider legs that cross land.
//!
//! Severe hazard zones on the corridor are then detoured around, and every
//! waypoint is given a display name.

use crate::error::{CoreError, Result, UpstreamError};
use crate::geodesy::{
    distance_nm, distance_to_segment_nm, path_length_nm, project_nm, segment_crosses_polygon,
    unproject_nm, GeoPoint,
};
use crate::hazard::{synthetic_hazards, HazardZoneService};
use crate::models::{
    HazardKind, HazardZone, Route, RouteSource, Severity, Waypoint, WaypointRole,
};
use crate::network::{Landmass, WaypointNetwork};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

/// Provider points this close to a requested endpoint are treated as that endpoint.
const ENDPOINT_SNAP_NM: f64 = 1.0;

/// One point of a provider route, as returned on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lng", alias = "longitude")]
    pub lon: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ProviderPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
            note: None,
        }
    }
}

/// External maritime-routing provider.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> std::result::Result<Vec<ProviderPoint>, UpstreamError>;
}

/// Origin or destination as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEndpoint {
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde(default)]
    pub name: Option<String>,
}

impl RouteEndpoint {
    pub fn new(position: GeoPoint) -> Self {
        Self {
            position,
            name: None,
        }
    }

    pub fn named(position: GeoPoint, name: impl Into<String>) -> Self {
        Self {
            position,
            name: Some(name.into()),
        }
    }
}

impl From<GeoPoint> for RouteEndpoint {
    fn from(position: GeoPoint) -> Self {
        Self::new(position)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeaRouteConfig {
    pub provider_timeout: Duration,
    /// Network/provider distance ratio above which a provider route is suspect.
    pub detour_ratio: f64,
    /// Clearance added to a severe zone's radius when routing around it.
    pub hazard_margin_nm: f64,
    /// Widest angle between consecutive avoidance waypoints.
    pub arc_step_deg: f64,
    pub max_avoidance_passes: usize,
    /// Use demo hazards when the weather source is unavailable.
    pub synthetic_hazards: bool,
}

impl Default for SeaRouteConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(8),
            detour_ratio: 1.1,
            hazard_margin_nm: 5.0,
            arc_step_deg: 30.0,
            max_avoidance_passes: 8,
            synthetic_hazards: true,
        }
    }
}

/// Where the hazard zones of a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardSource {
    Live,
    /// Demo zones generated because the weather source was down.
    Synthetic,
    /// No weather data and synthetic zones disabled.
    Unavailable,
}

/// Engine output: the route plus what was done to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub route: Route,
    pub hazards: Vec<HazardZone>,
    pub hazard_source: HazardSource,
    /// Distinct severe zones the route was detoured around.
    pub hazards_avoided: usize,
    /// Provider legs replaced because they crossed land.
    pub land_crossings_avoided: usize,
}

#[derive(Clone)]
pub struct SeaRouteEngine {
    network: Arc<WaypointNetwork>,
    provider: Option<Arc<dyn RouteProvider>>,
    hazards: HazardZoneService,
    config: SeaRouteConfig,
}

impl SeaRouteEngine {
    pub fn new(network: Arc<WaypointNetwork>, config: SeaRouteConfig) -> Self {
        Self {
            network,
            provider: None,
            hazards: HazardZoneService::offline(),
            config,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_hazard_service(mut self, hazards: HazardZoneService) -> Self {
        self.hazards = hazards;
        self
    }

    pub fn network(&self) -> &WaypointNetwork {
        &self.network
    }

    pub fn config(&self) -> &SeaRouteConfig {
        &self.config
    }

    /// Compute a named, hazard-aware route between two endpoints.
    ///
    /// Provider and weather failures degrade silently to the network path and
    /// to synthetic (or no) hazards. Only invalid coordinates and an
    /// unreachable network surface as errors.
    pub async fn compute_route(
        &self,
        origin: &RouteEndpoint,
        destination: &RouteEndpoint,
    ) -> Result<RoutePlan> {
        origin.position.validate()?;
        destination.position.validate()?;
        let (from, to) = (origin.position, destination.position);

        let (route, land_crossings_avoided) = match self.provider_route(from, to).await {
            Some(provider) => {
                let correction = reconcile(provider, &self.network, self.config.detour_ratio)?;
                (correction.route, correction.corrected_segments)
            }
            None => (self.network.shortest_path(from, to)?, 0),
        };

        let (hazards, hazard_source) = self.corridor_hazards(from, to).await;
        for zone in hazards.iter().filter(|zone| zone.severity == Severity::Moderate) {
            tracing::info!(center = %zone.center, radius_nm = zone.radius_nm, "moderate hazard on corridor, not avoided");
        }

        let avoidance = avoid_hazards(route, &hazards, self.network.landmasses(), &self.config);
        let route = assign_names(
            avoidance.route,
            origin.name.as_deref(),
            destination.name.as_deref(),
        );

        tracing::info!(
            source = ?route.source,
            distance_nm = route.total_distance_nm,
            waypoints = route.waypoints.len(),
            hazards = hazards.len(),
            hazards_avoided = avoidance.avoided,
            hazards_blocked_by_land = avoidance.blocked_by_land,
            land_crossings_avoided,
            "route computed"
        );

        Ok(RoutePlan {
            route,
            hazards,
            hazard_source,
            hazards_avoided: avoidance.avoided,
            land_crossings_avoided,
        })
    }

    async fn provider_route(&self, origin: GeoPoint, destination: GeoPoint) -> Option<Route> {
        let provider = self.provider.as_ref()?;
        let outcome = tokio::time::timeout(
            self.config.provider_timeout,
            provider.route(origin, destination),
        )
        .await
        .unwrap_or(Err(UpstreamError::Timeout))
        .and_then(|points| route_from_provider(origin, destination, points));

        match outcome {
            Ok(route) => Some(route),
            Err(err) => {
                tracing::warn!("routing provider unavailable, using waypoint network: {}", err);
                None
            }
        }
    }

    async fn corridor_hazards(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> (Vec<HazardZone>, HazardSource) {
        let corridor = self
            .hazards
            .hazards_along_corridor(origin, destination, self.hazards.config().sample_count)
            .await;
        if corridor.source_available {
            return (corridor.zones, HazardSource::Live);
        }
        if self.config.synthetic_hazards {
            tracing::warn!("weather source unavailable, using synthetic demo hazards");
            (synthetic_hazards(origin, destination), HazardSource::Synthetic)
        } else {
            (Vec::new(), HazardSource::Unavailable)
        }
    }
}

/// Turn a provider payload into a route anchored on the requested endpoints.
pub fn route_from_provider(
    origin: GeoPoint,
    destination: GeoPoint,
    points: Vec<ProviderPoint>,
) -> std::result::Result<Route, UpstreamError> {
    if points.len() < 2 {
        return Err(UpstreamError::Malformed(format!(
            "expected at least 2 points, got {}",
            points.len()
        )));
    }

    let last = points.len() - 1;
    let mut waypoints = vec![Waypoint::new(origin, WaypointRole::Origin)];
    for (idx, point) in points.into_iter().enumerate() {
        let position = GeoPoint::new(point.lat, point.lon);
        if !position.is_valid() {
            return Err(UpstreamError::Malformed(format!(
                "invalid coordinate at index {idx}"
            )));
        }
        let snaps_to_origin = idx == 0 && distance_nm(position, origin) <= ENDPOINT_SNAP_NM;
        let snaps_to_destination =
            idx == last && distance_nm(position, destination) <= ENDPOINT_SNAP_NM;
        if snaps_to_origin || snaps_to_destination {
            continue;
        }

        let mut waypoint = Waypoint::new(position, WaypointRole::Provider);
        waypoint.name = point.name;
        waypoint.note = point.note;
        waypoints.push(waypoint);
    }
    waypoints.push(Waypoint::new(destination, WaypointRole::Destination));

    Ok(Route::new(waypoints, RouteSource::Api))
}

// ========== HYBRID CORRECTION ==========

#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub route: Route,
    pub corrected_segments: usize,
}

/// Validate a provider route against the waypoint network and correct it.
///
/// A leg is suspect when it crosses a landmass, or, once the network needs
/// more than `detour_ratio` times the provider distance end to end, when the
/// network path for that leg is itself more than `detour_ratio` times longer.
/// Suspect legs are replaced by network sub-paths (`Hybrid`). If the ratio
/// fires but no single leg explains it, the whole network path is used.
pub fn reconcile(provider: Route, network: &WaypointNetwork, detour_ratio: f64) -> Result<Correction> {
    let (Some(first), Some(last)) = (provider.waypoints.first(), provider.waypoints.last()) else {
        return Err(CoreError::InvalidInput("provider route has no waypoints".into()));
    };
    let (origin, destination) = (first.position, last.position);

    let network_route = match network.shortest_path(origin, destination) {
        Ok(route) => Some(route),
        Err(err @ CoreError::RouteUnreachable { .. }) => {
            tracing::warn!("cannot validate provider route against network: {}", err);
            None
        }
        Err(err) => return Err(err),
    };
    let ratio_suspect = network_route
        .as_ref()
        .is_some_and(|route| route.total_distance_nm > detour_ratio * provider.total_distance_nm);

    let mut suspect: Vec<usize> = Vec::new();
    for (idx, pair) in provider.waypoints.windows(2).enumerate() {
        let (start, end) = (pair[0].position, pair[1].position);
        if let Some(land) = network.crossing_landmass(start, end) {
            tracing::debug!(segment = idx, landmass = %land.name, "provider leg crosses land");
            suspect.push(idx);
        } else if ratio_suspect && leg_needs_detour(network, start, end, detour_ratio) {
            tracing::debug!(segment = idx, "provider leg shorter than any network path");
            suspect.push(idx);
        }
    }

    if suspect.is_empty() {
        if let (true, Some(route)) = (ratio_suspect, network_route) {
            tracing::info!("provider route rejected as a whole, using waypoint network");
            return Ok(Correction {
                route,
                corrected_segments: 1,
            });
        }
        return Ok(Correction {
            route: provider,
            corrected_segments: 0,
        });
    }

    let mut waypoints = Vec::with_capacity(provider.waypoints.len() + suspect.len() * 4);
    let mut corrected = 0usize;
    let segment_count = provider.waypoints.len() - 1;
    for (idx, waypoint) in provider.waypoints.iter().enumerate() {
        waypoints.push(waypoint.clone());
        if idx >= segment_count || !suspect.contains(&idx) {
            continue;
        }
        let next = provider.waypoints[idx + 1].position;
        match network.shortest_path(waypoint.position, next) {
            Ok(leg) => {
                let interior = &leg.waypoints[1..leg.waypoints.len() - 1];
                waypoints.extend(interior.iter().cloned());
                corrected += 1;
            }
            Err(err) => {
                tracing::warn!(segment = idx, "provider leg left uncorrected: {}", err);
            }
        }
    }

    let source = if corrected > 0 {
        RouteSource::Hybrid
    } else {
        RouteSource::Api
    };
    Ok(Correction {
        route: Route::new(waypoints, source),
        corrected_segments: corrected,
    })
}

fn leg_needs_detour(network: &WaypointNetwork, start: GeoPoint, end: GeoPoint, ratio: f64) -> bool {
    let direct = distance_nm(start, end);
    network
        .shortest_path(start, end)
        .map(|route| route.total_distance_nm > ratio * direct)
        .unwrap_or(false)
}

// ========== HAZARD AVOIDANCE ==========

#[derive(Debug, Clone, PartialEq)]
pub struct Avoidance {
    pub route: Route,
    /// Distinct severe zones detoured around.
    pub avoided: usize,
    /// Severe zones left on the route because every detour crossed land.
    pub blocked_by_land: usize,
}

/// One or more severe zones routed around as a single circle.
#[derive(Debug, Clone)]
struct Obstacle {
    center: GeoPoint,
    radius_nm: f64,
    kind: HazardKind,
    /// Indices into the caller's zone list.
    members: Vec<usize>,
}

impl Obstacle {
    fn from_zone(idx: usize, zone: &HazardZone) -> Self {
        Self {
            center: zone.center,
            radius_nm: zone.radius_nm,
            kind: zone.kind,
            members: vec![idx],
        }
    }

    /// Smallest circle containing both obstacles.
    fn enclosing(&self, other: &Obstacle) -> Obstacle {
        let (big, small) = if self.radius_nm >= other.radius_nm {
            (self, other)
        } else {
            (other, self)
        };
        let (dx, dy) = project_nm(small.center, big.center);
        let gap = dx.hypot(dy);
        let (center, radius_nm) = if gap + small.radius_nm <= big.radius_nm {
            (big.center, big.radius_nm)
        } else {
            let radius = (gap + big.radius_nm + small.radius_nm) / 2.0;
            let shift = (radius - big.radius_nm) / gap;
            (unproject_nm(dx * shift, dy * shift, big.center), radius)
        };

        let mut members: Vec<usize> = big.members.iter().chain(&small.members).copied().collect();
        members.sort_unstable();
        Obstacle {
            center,
            radius_nm,
            kind: big.kind,
            members,
        }
    }
}

/// Direction of travel around an obstacle centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Counterclockwise,
    Clockwise,
}

enum Detour {
    Replaced(Vec<Waypoint>),
    EndpointCovered,
    BlockedByLand,
}

/// Detour around every severe zone whose radius a route leg enters.
///
/// Severe zones whose padded circles overlap are merged first, so a cluster
/// costs one detour instead of several. The waypoints inside the padded zone
/// are replaced by an arc of hazard-avoidance waypoints at `radius + margin`,
/// entered and left along tangents. Both directions around the zone are
/// tried and the shorter one whose legs stay off `landmasses` is used.
///
/// Zones covering the origin or destination are skipped. Zones with land on
/// both sides stay on the route and the leg entering them carries a note.
pub fn avoid_hazards(
    route: Route,
    zones: &[HazardZone],
    landmasses: &[Landmass],
    config: &SeaRouteConfig,
) -> Avoidance {
    let mut route = route;
    let obstacles = merge_overlapping(zones, &route, config.hazard_margin_nm);
    let mut avoided = BTreeSet::new();
    let mut blocked = BTreeSet::new();
    let mut unavoidable = BTreeSet::new();

    for _ in 0..config.max_avoidance_passes.max(1) {
        let mut changed = false;
        for (idx, obstacle) in obstacles.iter().enumerate() {
            if unavoidable.contains(&idx) {
                continue;
            }
            let Some(segment) = first_intrusion(&route, obstacle) else {
                continue;
            };
            match detour(&route, segment, obstacle, landmasses, config) {
                Detour::Replaced(waypoints) => {
                    route = Route::new(waypoints, route.source);
                    avoided.extend(obstacle.members.iter().copied());
                    changed = true;
                }
                Detour::EndpointCovered => {
                    tracing::warn!(center = %obstacle.center, radius_nm = obstacle.radius_nm, "severe hazard covers a route endpoint, not avoided");
                    unavoidable.insert(idx);
                }
                Detour::BlockedByLand => {
                    tracing::warn!(center = %obstacle.center, radius_nm = obstacle.radius_nm, "every detour around severe hazard crosses land, leg kept");
                    let note = format!(
                        "passes within severe {} zone: detour blocked by land",
                        obstacle.kind.as_str()
                    );
                    let waypoint = &mut route.waypoints[segment];
                    waypoint.note = Some(match waypoint.note.take() {
                        Some(existing) => format!("{existing}; {note}"),
                        None => note,
                    });
                    for member in &obstacle.members {
                        avoided.remove(member);
                        blocked.insert(*member);
                    }
                    unavoidable.insert(idx);
                }
            }
        }
        if !changed {
            break;
        }
    }

    Avoidance {
        route,
        avoided: avoided.len(),
        blocked_by_land: blocked.len(),
    }
}

/// Severe zones as obstacles, with overlapping padded circles folded together.
///
/// A merge that would swallow the route's origin or destination is not made.
fn merge_overlapping(zones: &[HazardZone], route: &Route, margin_nm: f64) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = zones
        .iter()
        .enumerate()
        .filter(|(_, zone)| zone.is_severe())
        .map(|(idx, zone)| Obstacle::from_zone(idx, zone))
        .collect();
    let endpoints: Vec<GeoPoint> = route
        .waypoints
        .first()
        .into_iter()
        .chain(route.waypoints.last())
        .map(|wp| wp.position)
        .collect();

    loop {
        let count = obstacles.len();
        let merge = (0..count)
            .flat_map(|i| (i + 1..count).map(move |j| (i, j)))
            .find_map(|(i, j)| {
                let (a, b) = (&obstacles[i], &obstacles[j]);
                if distance_nm(a.center, b.center) >= a.radius_nm + b.radius_nm + 2.0 * margin_nm {
                    return None;
                }
                let merged = a.enclosing(b);
                let swallows_endpoint = endpoints
                    .iter()
                    .any(|point| distance_nm(*point, merged.center) < merged.radius_nm);
                (!swallows_endpoint).then_some((i, j, merged))
            });
        let Some((i, j, merged)) = merge else {
            break;
        };
        tracing::debug!(zones = ?merged.members, radius_nm = merged.radius_nm, "merged overlapping severe zones");
        obstacles.remove(j);
        obstacles[i] = merged;
    }

    obstacles
}

fn first_intrusion(route: &Route, obstacle: &Obstacle) -> Option<usize> {
    route.waypoints.windows(2).position(|pair| {
        distance_to_segment_nm(obstacle.center, pair[0].position, pair[1].position)
            < obstacle.radius_nm
    })
}

/// Replace the intrusion at `segment` with the shortest land-free way round.
fn detour(
    route: &Route,
    segment: usize,
    obstacle: &Obstacle,
    landmasses: &[Landmass],
    config: &SeaRouteConfig,
) -> Detour {
    let clearance = obstacle.radius_nm + config.hazard_margin_nm;
    let center = obstacle.center;
    let inside_padded = |wp: &Waypoint| distance_nm(wp.position, center) < clearance;

    // Widen to the waypoints just outside the padded zone; never past the endpoints.
    let last = route.waypoints.len() - 1;
    let mut entry = segment;
    while entry > 0 && inside_padded(&route.waypoints[entry]) {
        entry -= 1;
    }
    let mut exit = segment + 1;
    while exit < last && inside_padded(&route.waypoints[exit]) {
        exit += 1;
    }

    let from = route.waypoints[entry].position;
    let to = route.waypoints[exit].position;
    if distance_nm(from, center) < obstacle.radius_nm || distance_nm(to, center) < obstacle.radius_nm {
        return Detour::EndpointCovered;
    }

    let mut candidates = Vec::with_capacity(3);
    if distance_to_segment_nm(center, from, to) >= clearance {
        candidates.push(Vec::new());
    }
    for turn in [Turn::Counterclockwise, Turn::Clockwise] {
        candidates.push(avoidance_arc(center, clearance, from, to, turn, config.arc_step_deg));
    }

    let crosses_land = |path: &[GeoPoint]| {
        path.windows(2).any(|leg| {
            landmasses
                .iter()
                .any(|land| segment_crosses_polygon(leg[0], leg[1], &land.outline))
        })
    };
    let best = candidates
        .into_iter()
        .map(|arc| {
            let mut path = Vec::with_capacity(arc.len() + 2);
            path.push(from);
            path.extend(arc);
            path.push(to);
            path
        })
        .filter(|path| !crosses_land(path.as_slice()))
        .min_by(|a, b| path_length_nm(a).total_cmp(&path_length_nm(b)));
    let Some(path) = best else {
        return Detour::BlockedByLand;
    };

    let note = format!(
        "clear of severe {} zone ({:.0} nm radius)",
        obstacle.kind.as_str(),
        obstacle.radius_nm
    );
    let arc = &path[1..path.len() - 1];
    let mut waypoints = Vec::with_capacity(route.waypoints.len() + arc.len());
    waypoints.extend(route.waypoints[..=entry].iter().cloned());
    waypoints.extend(
        arc.iter()
            .map(|point| Waypoint::new(*point, WaypointRole::HazardAvoidance).with_note(note.clone())),
    );
    waypoints.extend(route.waypoints[exit..].iter().cloned());
    Detour::Replaced(waypoints)
}

/// Angle where the tangent from `point` touches the circle when leaving or
/// joining it in the `turn` direction. Points inside the circle use their bearing.
fn tangent_angle(point: (f64, f64), clearance: f64, turn: Turn, leaving: bool) -> f64 {
    let bearing = point.1.atan2(point.0);
    let dist = point.0.hypot(point.1);
    let spread = if dist > clearance {
        (clearance / dist).acos()
    } else {
        0.0
    };
    match (turn, leaving) {
        (Turn::Counterclockwise, false) | (Turn::Clockwise, true) => bearing + spread,
        (Turn::Counterclockwise, true) | (Turn::Clockwise, false) => bearing - spread,
    }
}

/// Points around `center` at `clearance`, from the tangent of `from` to the
/// tangent of `to`, turning in the `turn` direction.
///
/// Arc points sit at `clearance / cos(step / 2)` so the chords between them
/// never come closer than `clearance` to the centre.
fn avoidance_arc(
    center: GeoPoint,
    clearance: f64,
    from: GeoPoint,
    to: GeoPoint,
    turn: Turn,
    max_step_deg: f64,
) -> Vec<GeoPoint> {
    let start = tangent_angle(project_nm(from, center), clearance, turn, false);
    let end = tangent_angle(project_nm(to, center), clearance, turn, true);
    let sweep = match turn {
        Turn::Counterclockwise => (end - start).rem_euclid(TAU),
        Turn::Clockwise => -(start - end).rem_euclid(TAU),
    };

    if sweep.abs() < 1e-9 {
        let (x, y) = (clearance * start.cos(), clearance * start.sin());
        return vec![unproject_nm(x, y, center)];
    }

    let max_step = max_step_deg.clamp(5.0, 90.0).to_radians();
    let steps = (sweep.abs() / max_step).ceil().max(1.0) as usize;
    let step = sweep / steps as f64;
    let radius = clearance / (step.abs() / 2.0).cos();
    (0..=steps)
        .map(|k| {
            let angle = start + step * k as f64;
            unproject_nm(radius * angle.cos(), radius * angle.sin(), center)
        })
        .collect()
}

// ========== NAMING ==========

/// Caller names on the endpoints, network/provider names kept, "Waypoint N" otherwise.
pub fn assign_names(mut route: Route, origin: Option<&str>, destination: Option<&str>) -> Route {
    let last = route.waypoints.len().saturating_sub(1);
    for (idx, waypoint) in route.waypoints.iter_mut().enumerate() {
        if idx == 0 {
            waypoint.name = Some(origin.unwrap_or("Origin").to_string());
        } else if idx == last {
            waypoint.name = Some(destination.unwrap_or("Destination").to_string());
        } else if waypoint.name.is_none() {
            waypoint.name = Some(format!("Waypoint {idx}"));
        }
    }
    route
}
