pub mod error;
pub mod geodesy;
pub mod hazard;
pub mod models;
pub mod network;
pub mod optimizer;
pub mod route_engine;
pub mod voyage;

pub use error::{CoreError, Result, UpstreamError};
pub use geodesy::{bearing_deg, distance_nm, GeoPoint};
pub use hazard::{
    classify, synthetic_hazards, CorridorHazards, HazardConfig, HazardZoneService,
    WeatherConditions, WeatherSource,
};
pub use models::{
    Assignment, AssignmentStatus, HazardKind, HazardZone, Priority, Project, Route, RouteSource,
    Severity, TimeWindow, Vessel, VesselType, Waypoint, WaypointRole,
};
pub use network::{Landmass, NetworkBuilder, NetworkConfig, NetworkEdge, NetworkNode, WaypointNetwork};
pub use optimizer::{
    optimize, CandidateScorer, CompositeScore, FleetOptimizer, GreatCircleCost,
    OptimizationEstimates, OptimizationResult, OptimizationWarning, OptimizerConfig,
    TravelCostModel, VesselUtilization, WarningKind,
};
pub use route_engine::{
    assign_names, avoid_hazards, reconcile, route_from_provider, HazardSource, ProviderPoint,
    RouteEndpoint, RouteProvider, RoutePlan, SeaRouteConfig, SeaRouteEngine,
};
pub use voyage::{
    plan_voyage, Prioritize, Recommendation, RouteMetrics, SafetyImprovement, VoyageConfig,
    VoyagePlan, VoyagePreferences, VoyageRequest, VoyageRoute, VoyageSummary,
};
