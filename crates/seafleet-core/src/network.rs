//! Static waypoint network used as the fallback and corrective route source.
//!
//! Nodes live in an arena and edges refer to them by index. The graph is built
//! once, never mutated afterwards, and shared read-only between requests.
//! Edges that cross a landmass polygon are dropped at build time, so queries
//! never re-check them.

use crate::error::{CoreError, Result};
use crate::geodesy::{distance_nm, point_in_polygon, segment_crosses_polygon, GeoPoint};
use crate::models::{Route, RouteSource, Waypoint, WaypointRole};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Endpoints closer than this to a network node are not duplicated in the path.
const COINCIDENT_NM: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub name: String,
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Hard-coded land area that edges and entry legs must not cross.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmass {
    pub name: String,
    pub outline: Vec<GeoPoint>,
}

/// Undirected edge as exposed to callers listing the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
    pub distance_nm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Nearest water-reachable nodes an origin/destination is linked to.
    pub entry_candidates: usize,
    /// Longest entry/exit leg considered part of the covered region.
    pub max_entry_nm: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            entry_candidates: 3,
            max_entry_nm: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: usize,
    distance_nm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FloatOrd(f64);

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// How an endpoint joins the graph.
struct Attachment {
    legs: Vec<(usize, f64)>,
    synthetic: bool,
}

// ========== BUILDER ==========

#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<NetworkNode>,
    links: Vec<(String, String)>,
    landmasses: Vec<Landmass>,
    config: NetworkConfig,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn node(mut self, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        self.nodes.push(NetworkNode {
            name: name.into(),
            position: GeoPoint::new(lat, lon),
            note: None,
        });
        self
    }

    pub fn node_with_note(
        mut self,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        note: impl Into<String>,
    ) -> Self {
        self.nodes.push(NetworkNode {
            name: name.into(),
            position: GeoPoint::new(lat, lon),
            note: Some(note.into()),
        });
        self
    }

    pub fn link(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.links.push((a.into(), b.into()));
        self
    }

    /// Polygon ring given as `(lat, lon)` pairs.
    pub fn landmass(mut self, name: impl Into<String>, outline: &[(f64, f64)]) -> Self {
        self.landmasses.push(Landmass {
            name: name.into(),
            outline: outline
                .iter()
                .map(|(lat, lon)| GeoPoint::new(*lat, *lon))
                .collect(),
        });
        self
    }

    pub fn build(self) -> Result<WaypointNetwork> {
        for landmass in &self.landmasses {
            if landmass.outline.len() < 3 {
                return Err(CoreError::InvalidInput(format!(
                    "landmass {} needs at least 3 vertices",
                    landmass.name
                )));
            }
            for vertex in &landmass.outline {
                vertex.validate()?;
            }
        }

        let mut index: HashMap<String, usize> = HashMap::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            node.position.validate()?;
            if index.insert(node.name.clone(), idx).is_some() {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate network node {}",
                    node.name
                )));
            }
            if let Some(land) = self
                .landmasses
                .iter()
                .find(|land| point_in_polygon(node.position, &land.outline))
            {
                return Err(CoreError::InvalidInput(format!(
                    "network node {} lies on {}",
                    node.name, land.name
                )));
            }
        }

        let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); self.nodes.len()];
        for (a, b) in &self.links {
            let from = *index
                .get(a)
                .ok_or_else(|| CoreError::InvalidInput(format!("unknown network node {a}")))?;
            let to = *index
                .get(b)
                .ok_or_else(|| CoreError::InvalidInput(format!("unknown network node {b}")))?;
            if from == to || adjacency[from].iter().any(|edge| edge.to == to) {
                continue;
            }

            let start = self.nodes[from].position;
            let end = self.nodes[to].position;
            if let Some(land) = self
                .landmasses
                .iter()
                .find(|land| segment_crosses_polygon(start, end, &land.outline))
            {
                tracing::warn!(from = %a, to = %b, landmass = %land.name, "dropping edge across land");
                continue;
            }

            let length = distance_nm(start, end);
            adjacency[from].push(Edge {
                to,
                distance_nm: length,
            });
            adjacency[to].push(Edge {
                to: from,
                distance_nm: length,
            });
        }

        let network = WaypointNetwork {
            nodes: self.nodes,
            adjacency,
            landmasses: self.landmasses,
            config: self.config,
        };
        tracing::debug!(
            nodes = network.nodes.len(),
            edges = network.edge_count(),
            landmasses = network.landmasses.len(),
            "waypoint network built"
        );
        Ok(network)
    }
}

// ========== NETWORK ==========

#[derive(Debug, Clone)]
pub struct WaypointNetwork {
    nodes: Vec<NetworkNode>,
    adjacency: Vec<Vec<Edge>>,
    landmasses: Vec<Landmass>,
    config: NetworkConfig,
}

impl WaypointNetwork {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Default service region: Arabian Gulf, Strait of Hormuz and Gulf of Oman.
    pub fn arabian_gulf() -> Result<Self> {
        Self::builder()
            .node("Kuwait Approach", 29.30, 48.30)
            .node("Ras Tanura Anchorage", 26.75, 50.30)
            .node_with_note("Bahrain North Channel", 26.40, 50.70, "dredged channel, reduced speed")
            .node("Qatar North", 26.45, 51.40)
            .node("Ras Laffan Offshore", 26.00, 51.85)
            .node("Doha Approach", 25.35, 51.75)
            .node("Das Island Lane", 25.20, 52.85)
            .node("Ruwais Offshore", 24.40, 52.60)
            .node_with_note("Abu Dhabi Fairway", 24.60, 54.45, "protected channel")
            .node("Ghantoot Offshore", 24.85, 54.78)
            .node_with_note("Jebel Ali Approach", 25.06, 55.02, "port limits, pilotage required")
            .node("Dubai Offshore", 25.25, 55.22)
            .node("Sharjah Anchorage", 25.40, 55.38)
            .node("Ras Al Khaimah Offshore", 25.85, 55.80)
            .node("Hormuz West", 26.45, 56.05)
            .node_with_note("Strait of Hormuz", 26.62, 56.48, "traffic separation scheme")
            .node("Bandar Abbas Roads", 27.05, 56.25)
            .node("Hormuz East", 26.30, 56.75)
            .node("Khor Fakkan Approach", 25.35, 56.42)
            .node_with_note("Fujairah Anchorage", 25.15, 56.45, "bunkering anchorage")
            .node("Sohar Offshore", 24.45, 56.85)
            .node("Muscat Approach", 23.70, 58.60)
            .link("Kuwait Approach", "Ras Tanura Anchorage")
            .link("Ras Tanura Anchorage", "Bahrain North Channel")
            .link("Bahrain North Channel", "Qatar North")
            .link("Qatar North", "Ras Laffan Offshore")
            .link("Ras Laffan Offshore", "Doha Approach")
            .link("Ras Laffan Offshore", "Das Island Lane")
            .link("Doha Approach", "Das Island Lane")
            .link("Das Island Lane", "Ruwais Offshore")
            .link("Das Island Lane", "Abu Dhabi Fairway")
            .link("Ruwais Offshore", "Abu Dhabi Fairway")
            .link("Abu Dhabi Fairway", "Ghantoot Offshore")
            .link("Ghantoot Offshore", "Jebel Ali Approach")
            .link("Jebel Ali Approach", "Dubai Offshore")
            .link("Dubai Offshore", "Sharjah Anchorage")
            .link("Sharjah Anchorage", "Ras Al Khaimah Offshore")
            .link("Das Island Lane", "Ras Al Khaimah Offshore")
            .link("Ras Al Khaimah Offshore", "Hormuz West")
            .link("Hormuz West", "Strait of Hormuz")
            .link("Hormuz West", "Bandar Abbas Roads")
            .link("Strait of Hormuz", "Bandar Abbas Roads")
            .link("Strait of Hormuz", "Hormuz East")
            .link("Hormuz East", "Khor Fakkan Approach")
            .link("Khor Fakkan Approach", "Fujairah Anchorage")
            .link("Fujairah Anchorage", "Sohar Offshore")
            .link("Sohar Offshore", "Muscat Approach")
            .landmass(
                "Qatar Peninsula",
                &[
                    (24.55, 50.80),
                    (25.00, 50.75),
                    (25.60, 50.80),
                    (26.15, 51.05),
                    (26.15, 51.30),
                    (25.60, 51.62),
                    (25.10, 51.62),
                    (24.60, 51.45),
                ],
            )
            .landmass(
                "Bahrain",
                &[(25.80, 50.45), (26.30, 50.45), (26.30, 50.65), (25.80, 50.65)],
            )
            .landmass(
                "Musandam Peninsula",
                &[
                    (24.90, 55.75),
                    (25.30, 55.50),
                    (25.55, 55.62),
                    (25.78, 55.98),
                    (26.05, 56.12),
                    (26.35, 56.35),
                    (26.30, 56.45),
                    (25.62, 56.30),
                    (25.34, 56.33),
                    (25.05, 56.32),
                    (24.90, 56.10),
                ],
            )
            .build()
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn landmasses(&self) -> &[Landmass] {
        &self.landmasses
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn node(&self, name: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Each undirected edge once, in node order.
    pub fn edges(&self) -> Vec<NetworkEdge> {
        let mut edges = Vec::with_capacity(self.edge_count());
        for (from, list) in self.adjacency.iter().enumerate() {
            for edge in list.iter().filter(|edge| edge.to > from) {
                edges.push(NetworkEdge {
                    from: self.nodes[from].name.clone(),
                    to: self.nodes[edge.to].name.clone(),
                    distance_nm: edge.distance_nm,
                });
            }
        }
        edges
    }

    /// First landmass the straight leg `start -> end` touches, if any.
    pub fn crossing_landmass(&self, start: GeoPoint, end: GeoPoint) -> Option<&Landmass> {
        self.landmasses
            .iter()
            .find(|land| segment_crosses_polygon(start, end, &land.outline))
    }

    /// Shortest path over the graph, entering and leaving through the nearest
    /// water-reachable nodes.
    ///
    /// Endpoints outside coverage are tied to their nearest node by a synthetic
    /// straight leg, flagged in the endpoint's note. Fails with
    /// `RouteUnreachable` when the two attachment sets are not connected.
    pub fn shortest_path(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Route> {
        origin.validate()?;
        destination.validate()?;

        let mut start = Waypoint::new(origin, WaypointRole::Origin);
        let mut end = Waypoint::new(destination, WaypointRole::Destination);
        if distance_nm(origin, destination) < COINCIDENT_NM {
            return Ok(Route::new(vec![start, end], RouteSource::Network));
        }

        let unreachable = |reason: &str| CoreError::RouteUnreachable {
            origin: origin.to_string(),
            destination: destination.to_string(),
            reason: reason.to_string(),
        };
        let (Some(entry), Some(exit)) = (self.attach(origin), self.attach(destination)) else {
            return Err(unreachable("waypoint network has no nodes"));
        };

        if entry.synthetic {
            let node = &self.nodes[entry.legs[0].0].name;
            tracing::warn!(%origin, node = %node, "origin outside network coverage");
            start = start.with_note(format!("synthetic leg to {node}: outside network coverage"));
        }
        if exit.synthetic {
            let node = &self.nodes[exit.legs[0].0].name;
            tracing::warn!(%destination, node = %node, "destination outside network coverage");
            end = end.with_note(format!("synthetic leg from {node}: outside network coverage"));
        }

        let path = self
            .dijkstra(&entry, &exit)
            .ok_or_else(|| unreachable("no connected path through the waypoint network"))?;

        let mut waypoints = Vec::with_capacity(path.len() + 2);
        waypoints.push(start);
        for idx in path {
            let node = &self.nodes[idx];
            if distance_nm(node.position, origin) < COINCIDENT_NM
                || distance_nm(node.position, destination) < COINCIDENT_NM
            {
                continue;
            }
            let mut waypoint =
                Waypoint::new(node.position, WaypointRole::NetworkNode).named(node.name.clone());
            waypoint.note = node.note.clone();
            waypoints.push(waypoint);
        }
        waypoints.push(end);

        let route = Route::new(waypoints, RouteSource::Network);
        tracing::debug!(
            %origin,
            %destination,
            waypoints = route.waypoints.len(),
            distance_nm = route.total_distance_nm,
            "network path found"
        );
        Ok(route)
    }

    fn attach(&self, point: GeoPoint) -> Option<Attachment> {
        let mut by_distance: Vec<(usize, f64)> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (idx, distance_nm(point, node.position)))
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let nearest = *by_distance.first()?;

        let legs: Vec<(usize, f64)> = by_distance
            .iter()
            .copied()
            .filter(|(_, distance)| *distance <= self.config.max_entry_nm)
            .filter(|(idx, _)| {
                self.crossing_landmass(point, self.nodes[*idx].position)
                    .is_none()
            })
            .take(self.config.entry_candidates.max(1))
            .collect();

        if legs.is_empty() {
            Some(Attachment {
                legs: vec![nearest],
                synthetic: true,
            })
        } else {
            Some(Attachment {
                legs,
                synthetic: false,
            })
        }
    }

    /// Node indices of the cheapest origin -> destination path.
    fn dijkstra(&self, entry: &Attachment, exit: &Attachment) -> Option<Vec<usize>> {
        let count = self.nodes.len();
        let source = count;
        let target = count + 1;
        let exits: HashMap<usize, f64> = exit.legs.iter().copied().collect();

        let mut dist = vec![f64::INFINITY; count + 2];
        let mut came_from: Vec<Option<usize>> = vec![None; count + 2];
        let mut open: BinaryHeap<Reverse<(FloatOrd, usize)>> = BinaryHeap::new();
        dist[source] = 0.0;
        open.push(Reverse((FloatOrd(0.0), source)));

        while let Some(Reverse((FloatOrd(cost), current))) = open.pop() {
            if current == target {
                break;
            }
            if cost > dist[current] {
                continue;
            }

            let mut neighbors: Vec<(usize, f64)> = if current == source {
                entry.legs.clone()
            } else {
                self.adjacency[current]
                    .iter()
                    .map(|edge| (edge.to, edge.distance_nm))
                    .collect()
            };
            if let Some(leg) = exits.get(&current) {
                neighbors.push((target, *leg));
            }

            for (next, weight) in neighbors {
                let tentative = cost + weight;
                if tentative < dist[next] {
                    dist[next] = tentative;
                    came_from[next] = Some(current);
                    open.push(Reverse((FloatOrd(tentative), next)));
                }
            }
        }

        if !dist[target].is_finite() {
            return None;
        }

        let mut path = Vec::new();
        let mut current = came_from[target];
        while let Some(idx) = current {
            if idx == source {
                break;
            }
            path.push(idx);
            current = came_from[idx];
        }
        path.reverse();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abu_dhabi() -> GeoPoint {
        GeoPoint::new(24.4539, 54.3773)
    }

    fn dubai() -> GeoPoint {
        GeoPoint::new(25.2697, 55.3095)
    }

    fn assert_water_only(network: &WaypointNetwork, route: &Route) {
        for pair in route.waypoints.windows(2) {
            assert!(
                network
                    .crossing_landmass(pair[0].position, pair[1].position)
                    .is_none(),
                "leg {:?} -> {:?} crosses land",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn gulf_network_keeps_every_edge() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        assert_eq!(network.nodes().len(), 22);
        assert_eq!(network.edge_count(), 25);
        assert_eq!(network.edges().len(), 25);
        assert_eq!(network.landmasses().len(), 3);
        assert!(network.node("Strait of Hormuz").is_some());
    }

    #[test]
    fn abu_dhabi_to_dubai_follows_the_coast() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        let route = network.shortest_path(abu_dhabi(), dubai()).unwrap();
        let direct = distance_nm(abu_dhabi(), dubai());

        assert_eq!(route.source, RouteSource::Network);
        assert!(route.is_well_formed());
        assert!(route.total_distance_nm >= direct);
        assert!(route.total_distance_nm <= direct * 1.05);
        assert!(route
            .waypoints
            .iter()
            .any(|wp| wp.name.as_deref() == Some("Jebel Ali Approach")));
        assert_water_only(&network, &route);
    }

    #[test]
    fn detours_around_musandam() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        let ras_al_khaimah = GeoPoint::new(25.85, 55.70);
        let fujairah = GeoPoint::new(25.12, 56.50);
        assert!(network.crossing_landmass(ras_al_khaimah, fujairah).is_some());

        let route = network.shortest_path(ras_al_khaimah, fujairah).unwrap();
        assert!(route.total_distance_nm > distance_nm(ras_al_khaimah, fujairah) * 1.1);
        assert!(route
            .waypoints
            .iter()
            .any(|wp| wp.name.as_deref() == Some("Strait of Hormuz")));
        assert_water_only(&network, &route);
    }

    #[test]
    fn far_endpoint_gets_synthetic_leg() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        let red_sea = GeoPoint::new(21.5, 39.0);
        let route = network.shortest_path(red_sea, dubai()).unwrap();

        assert_eq!(route.source, RouteSource::Network);
        let note = route.waypoints[0].note.as_deref().unwrap_or_default();
        assert!(note.contains("synthetic leg"), "note was {note:?}");
        assert!(route.waypoints.last().unwrap().note.is_none());
    }

    #[test]
    fn disconnected_regions_are_unreachable() {
        let network = WaypointNetwork::builder()
            .node("A", 0.0, 0.0)
            .node("B", 0.0, 1.0)
            .node("C", 10.0, 10.0)
            .node("D", 10.0, 11.0)
            .link("A", "B")
            .link("C", "D")
            .build()
            .unwrap();

        let err = network
            .shortest_path(GeoPoint::new(0.0, 0.1), GeoPoint::new(10.0, 10.9))
            .unwrap_err();
        assert!(matches!(err, CoreError::RouteUnreachable { .. }));
    }

    #[test]
    fn empty_network_is_unreachable() {
        let network = WaypointNetwork::builder().build().unwrap();
        let err = network
            .shortest_path(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), "RouteUnreachable");
    }

    #[test]
    fn edges_across_land_are_dropped() {
        let network = WaypointNetwork::builder()
            .node("West", 0.0, 0.0)
            .node("East", 0.0, 2.0)
            .link("West", "East")
            .landmass(
                "Island",
                &[(-0.5, 0.8), (0.5, 0.8), (0.5, 1.2), (-0.5, 1.2)],
            )
            .build()
            .unwrap();
        assert_eq!(network.edge_count(), 0);
    }

    #[test]
    fn rejects_bad_definitions() {
        let unknown = WaypointNetwork::builder()
            .node("A", 0.0, 0.0)
            .link("A", "Nowhere")
            .build();
        assert!(matches!(unknown, Err(CoreError::InvalidInput(_))));

        let duplicate = WaypointNetwork::builder()
            .node("A", 0.0, 0.0)
            .node("A", 1.0, 1.0)
            .build();
        assert!(matches!(duplicate, Err(CoreError::InvalidInput(_))));

        let bad_coord = WaypointNetwork::builder().node("A", 95.0, 0.0).build();
        assert!(matches!(bad_coord, Err(CoreError::InvalidCoordinate { .. })));
    }

    #[test]
    fn invalid_endpoint_fails_fast() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        let err = network
            .shortest_path(GeoPoint::new(f64::NAN, 54.0), dubai())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidCoordinate { .. }));
    }

    #[test]
    fn same_endpoints_give_two_waypoints() {
        let network = WaypointNetwork::arabian_gulf().unwrap();
        let route = network.shortest_path(dubai(), dubai()).unwrap();
        assert_eq!(route.waypoints.len(), 2);
        assert_eq!(route.total_distance_nm, 0.0);
    }
}
