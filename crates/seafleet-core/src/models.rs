//! Core data models for routing and fleet assignment.

use crate::error::{CoreError, Result};
use crate::geodesy::{path_length_nm, GeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_FUEL_BURN_L_PER_NM: f64 = 30.0;
const DEFAULT_CRUISE_SPEED_KN: f64 = 10.0;

// ========== FLEET MODELS ==========

/// Vessel class. Unknown class names are kept verbatim in [`VesselType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VesselType {
    Dredger,
    HopperDredger,
    CutterSuction,
    CraneBarge,
    Supply,
    Tug,
    Survey,
    JackUp,
    Other(String),
}

impl VesselType {
    pub fn as_str(&self) -> &str {
        match self {
            VesselType::Dredger => "dredger",
            VesselType::HopperDredger => "hopper_dredger",
            VesselType::CutterSuction => "cutter_suction",
            VesselType::CraneBarge => "crane_barge",
            VesselType::Supply => "supply",
            VesselType::Tug => "tug",
            VesselType::Survey => "survey",
            VesselType::JackUp => "jack_up",
            VesselType::Other(name) => name,
        }
    }

    /// Fuel burn in liters per nautical mile. Unknown classes use the default rate.
    pub fn fuel_burn_rate_per_nm(&self) -> f64 {
        match self {
            VesselType::Dredger => 45.0,
            VesselType::HopperDredger => 60.0,
            VesselType::CutterSuction => 55.0,
            VesselType::CraneBarge => 40.0,
            VesselType::Supply => 25.0,
            VesselType::Tug => 18.0,
            VesselType::Survey => 10.0,
            VesselType::JackUp => 50.0,
            VesselType::Other(_) => DEFAULT_FUEL_BURN_L_PER_NM,
        }
    }

    /// Typical transit speed used when a snapshot carries no speed.
    pub fn default_speed_knots(&self) -> f64 {
        match self {
            VesselType::Dredger => 9.0,
            VesselType::HopperDredger => 11.0,
            VesselType::CutterSuction => 8.0,
            VesselType::CraneBarge => 6.0,
            VesselType::Supply => 13.0,
            VesselType::Tug => 12.0,
            VesselType::Survey => 14.0,
            VesselType::JackUp => 5.0,
            VesselType::Other(_) => DEFAULT_CRUISE_SPEED_KN,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, VesselType::Other(_))
    }
}

impl From<String> for VesselType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "dredger" => VesselType::Dredger,
            "hopper_dredger" => VesselType::HopperDredger,
            "cutter_suction" => VesselType::CutterSuction,
            "crane_barge" => VesselType::CraneBarge,
            "supply" => VesselType::Supply,
            "tug" => VesselType::Tug,
            "survey" => VesselType::Survey,
            "jack_up" => VesselType::JackUp,
            _ => VesselType::Other(value),
        }
    }
}

impl From<&str> for VesselType {
    fn from(value: &str) -> Self {
        VesselType::from(value.to_string())
    }
}

impl From<VesselType> for String {
    fn from(value: VesselType) -> Self {
        match value {
            VesselType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for VesselType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a vessel supplied by the caller for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub vessel_type: VesselType,
    pub position: GeoPoint,
    #[serde(default, alias = "speed")]
    pub cruise_speed_knots: Option<f64>,
}

impl Vessel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        vessel_type: impl Into<VesselType>,
        position: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vessel_type: vessel_type.into(),
            position,
            cruise_speed_knots: None,
        }
    }

    pub fn with_speed(mut self, knots: f64) -> Self {
        self.cruise_speed_knots = Some(knots);
        self
    }

    /// Cruise speed, falling back to the class default when missing or non-positive.
    pub fn speed_knots(&self) -> f64 {
        self.cruise_speed_knots
            .filter(|speed| speed.is_finite() && *speed > 0.0)
            .unwrap_or_else(|| self.vessel_type.default_speed_knots())
    }

    pub fn fuel_burn_rate_per_nm(&self) -> f64 {
        self.vessel_type.fuel_burn_rate_per_nm()
    }
}

/// Project priority, ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn weight(self) -> f64 {
        match self {
            Priority::Critical => 4.0,
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low => 1.0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn validate(&self, id: &str) -> Result<()> {
        if self.start > self.end {
            return Err(CoreError::InvalidWindow {
                id: id.to_string(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds().max(0) as f64 / 3600.0
    }

    /// True once `as_of` has reached the end of the window.
    pub fn has_elapsed(&self, as_of: DateTime<Utc>) -> bool {
        self.end <= as_of
    }
}

/// A work site competing for vessels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub required_vessel_types: Vec<VesselType>,
    pub priority: Priority,
    pub window: TimeWindow,
}

impl Project {
    pub fn accepts(&self, vessel_type: &VesselType) -> bool {
        self.required_vessel_types.contains(vessel_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Scheduled and active assignments still hold their vessel.
    pub fn is_committed(self) -> bool {
        matches!(self, AssignmentStatus::Scheduled | AssignmentStatus::Active)
    }
}

/// A vessel committed to a project for a window, either pre-existing or proposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub vessel_id: String,
    pub project_id: String,
    pub window: TimeWindow,
    pub status: AssignmentStatus,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub utilization: f64,
}

// ========== ROUTE MODELS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointRole {
    Origin,
    Destination,
    NetworkNode,
    HazardAvoidance,
    /// Intermediate point taken verbatim from the routing provider.
    Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub role: WaypointRole,
}

impl Waypoint {
    pub fn new(position: GeoPoint, role: WaypointRole) -> Self {
        Self {
            position,
            name: None,
            note: None,
            role,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Where the geometry of a route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Live maritime-routing provider, accepted as-is.
    Api,
    /// Waypoint network shortest path.
    Network,
    /// Provider route corrected with network nodes.
    Hybrid,
    /// Straight great-circle leg, used for the direct comparison route.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    pub total_distance_nm: f64,
    pub source: RouteSource,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>, source: RouteSource) -> Self {
        let total_distance_nm = path_length_nm(&positions(&waypoints));
        Self {
            waypoints,
            total_distance_nm,
            source,
        }
    }

    /// Straight great-circle route between two endpoints.
    pub fn direct(origin: Waypoint, destination: Waypoint) -> Self {
        Self::new(vec![origin, destination], RouteSource::Direct)
    }

    /// First waypoint is the origin, last the destination, at least two waypoints.
    pub fn is_well_formed(&self) -> bool {
        self.waypoints.len() >= 2
            && self.waypoints.first().map(|wp| wp.role) == Some(WaypointRole::Origin)
            && self.waypoints.last().map(|wp| wp.role) == Some(WaypointRole::Destination)
    }
}

fn positions(waypoints: &[Waypoint]) -> Vec<GeoPoint> {
    waypoints.iter().map(|wp| wp.position).collect()
}

// ========== HAZARD MODELS ==========

/// Weather severity, ordered `Normal < Moderate < Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HazardKind {
    Storm,
    HighSwell,
}

impl HazardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HazardKind::Storm => "storm",
            HazardKind::HighSwell => "high-swell",
        }
    }
}

/// A circular region of elevated weather risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub center: GeoPoint,
    pub radius_nm: f64,
    pub severity: Severity,
    pub kind: HazardKind,
}

impl HazardZone {
    pub fn new(center: GeoPoint, radius_nm: f64, severity: Severity, kind: HazardKind) -> Self {
        Self {
            center,
            radius_nm,
            severity,
            kind,
        }
    }

    pub fn is_severe(&self) -> bool {
        self.severity == Severity::Severe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn unknown_vessel_type_uses_default_rates() {
        let odd = VesselType::from("pipe_layer");
        assert_eq!(odd, VesselType::Other("pipe_layer".to_string()));
        assert_eq!(odd.fuel_burn_rate_per_nm(), DEFAULT_FUEL_BURN_L_PER_NM);
        assert!(!odd.is_known());
        assert_eq!(VesselType::from("tug"), VesselType::Tug);
    }

    #[test]
    fn vessel_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&VesselType::HopperDredger).unwrap();
        assert_eq!(json, "\"hopper_dredger\"");
        let parsed: VesselType = serde_json::from_str("\"barge_x\"").unwrap();
        assert_eq!(parsed.as_str(), "barge_x");
    }

    #[test]
    fn vessel_speed_falls_back_to_class_default() {
        let tug = Vessel::new("v1", "Tug One", "tug", GeoPoint::new(25.0, 55.0));
        assert_eq!(tug.speed_knots(), 12.0);
        assert_eq!(tug.clone().with_speed(0.0).speed_knots(), 12.0);
        assert_eq!(tug.with_speed(9.5).speed_knots(), 9.5);
    }

    #[test]
    fn priorities_order_and_weigh() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::Critical.weight(), 4.0);
        assert_eq!(Priority::Low.weight(), 1.0);
    }

    #[test]
    fn windows_overlap_half_open() {
        let a = TimeWindow::new(at(1), at(5));
        let b = TimeWindow::new(at(5), at(8));
        let c = TimeWindow::new(at(4), at(6));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert_eq!(a.duration_hours(), 96.0);
        assert!(a.has_elapsed(at(5)));
        assert!(!a.has_elapsed(at(4)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let window = TimeWindow::new(at(5), at(1));
        assert!(matches!(
            window.validate("p-1"),
            Err(CoreError::InvalidWindow { ref id, .. }) if id == "p-1"
        ));
    }

    #[test]
    fn waypoint_serializes_flat() {
        let wp = Waypoint::new(GeoPoint::new(25.0, 55.0), WaypointRole::Origin).named("Dubai");
        let value = serde_json::to_value(&wp).unwrap();
        assert_eq!(value["lat"], 25.0);
        assert_eq!(value["role"], "origin");
        assert!(value.get("note").is_none());
    }
}
