//! Caller-facing voyage planning: optimized route vs. direct route, with metrics.

use crate::error::{CoreError, Result};
use crate::geodesy::GeoPoint;
use crate::models::{HazardZone, Route, Vessel, Waypoint, WaypointRole};
use crate::route_engine::{HazardSource, RouteEndpoint, SeaRouteEngine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prioritize {
    Time,
    Fuel,
    Safety,
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoyagePreferences {
    /// Echoed back in the plan; route selection does not weight it yet.
    #[serde(default)]
    pub prioritize: Prioritize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoyageRequest {
    pub vessel: Vessel,
    pub origin: RouteEndpoint,
    pub destination: RouteEndpoint,
    #[serde(default)]
    pub preferences: Option<VoyagePreferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoyageConfig {
    pub fuel_price_usd_per_liter: f64,
    /// Speed for vessels of unknown type that report none.
    pub default_speed_knots: f64,
}

impl Default for VoyageConfig {
    fn default() -> Self {
        Self {
            fuel_price_usd_per_liter: 0.85,
            default_speed_knots: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub distance_nm: f64,
    pub estimated_duration_hours: f64,
    pub estimated_fuel_liters: f64,
    pub estimated_cost_usd: f64,
}

impl RouteMetrics {
    pub fn compute(distance_nm: f64, speed_knots: f64, burn_rate_per_nm: f64, fuel_price: f64) -> Self {
        let estimated_fuel_liters = distance_nm * burn_rate_per_nm;
        Self {
            distance_nm,
            estimated_duration_hours: distance_nm / speed_knots,
            estimated_fuel_liters,
            estimated_cost_usd: estimated_fuel_liters * fuel_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoyageRoute {
    #[serde(flatten)]
    pub route: Route,
    pub metrics: RouteMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyImprovement {
    Minor,
    Moderate,
    Significant,
}

impl SafetyImprovement {
    /// Rating from the number of distinct hazards and land crossings avoided.
    pub fn from_avoided(count: usize) -> Self {
        match count {
            0 => SafetyImprovement::Minor,
            1 => SafetyImprovement::Moderate,
            _ => SafetyImprovement::Significant,
        }
    }
}

/// Only `use_optimized` today; other recommendations would slot in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    UseOptimized,
}

/// Optimized minus direct, so positive values are what the detours cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoyageSummary {
    pub distance_delta_nm: f64,
    pub duration_delta_hours: f64,
    pub fuel_delta_liters: f64,
    pub cost_delta_usd: f64,
    pub hazards_avoided: usize,
    pub land_crossings_avoided: usize,
    pub safety_improvement: SafetyImprovement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoyagePlan {
    pub vessel_id: String,
    pub speed_knots: f64,
    pub original_route: VoyageRoute,
    pub optimized_route: VoyageRoute,
    pub hazards: Vec<HazardZone>,
    pub hazard_source: HazardSource,
    pub summary: VoyageSummary,
    pub recommendation: Recommendation,
    pub preferences: VoyagePreferences,
}

/// Speed used for estimates: reported speed, class default, then the configured default.
pub fn voyage_speed(vessel: &Vessel, config: &VoyageConfig) -> f64 {
    match vessel.cruise_speed_knots {
        Some(speed) if speed.is_finite() && speed > 0.0 => speed,
        _ if vessel.vessel_type.is_known() => vessel.vessel_type.default_speed_knots(),
        _ => config.default_speed_knots,
    }
}

pub async fn plan_voyage(
    engine: &SeaRouteEngine,
    request: &VoyageRequest,
    config: &VoyageConfig,
) -> Result<VoyagePlan> {
    let speed = voyage_speed(&request.vessel, config);
    if !speed.is_finite() || speed <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "vessel {} has no usable speed",
            request.vessel.id
        )));
    }
    if !config.fuel_price_usd_per_liter.is_finite() || config.fuel_price_usd_per_liter < 0.0 {
        return Err(CoreError::InvalidInput("fuel price must be non-negative".into()));
    }

    let plan = engine
        .compute_route(&request.origin, &request.destination)
        .await?;
    let direct = direct_route(&request.origin, &request.destination);

    let burn_rate = request.vessel.fuel_burn_rate_per_nm();
    let price = config.fuel_price_usd_per_liter;
    let original = RouteMetrics::compute(direct.total_distance_nm, speed, burn_rate, price);
    let optimized = RouteMetrics::compute(plan.route.total_distance_nm, speed, burn_rate, price);

    let summary = VoyageSummary {
        distance_delta_nm: optimized.distance_nm - original.distance_nm,
        duration_delta_hours: optimized.estimated_duration_hours - original.estimated_duration_hours,
        fuel_delta_liters: optimized.estimated_fuel_liters - original.estimated_fuel_liters,
        cost_delta_usd: optimized.estimated_cost_usd - original.estimated_cost_usd,
        hazards_avoided: plan.hazards_avoided,
        land_crossings_avoided: plan.land_crossings_avoided,
        safety_improvement: SafetyImprovement::from_avoided(
            plan.hazards_avoided + plan.land_crossings_avoided,
        ),
    };

    tracing::debug!(
        vessel = %request.vessel.id,
        distance_nm = optimized.distance_nm,
        delta_nm = summary.distance_delta_nm,
        safety = ?summary.safety_improvement,
        "voyage planned"
    );

    Ok(VoyagePlan {
        vessel_id: request.vessel.id.clone(),
        speed_knots: speed,
        original_route: VoyageRoute {
            route: direct,
            metrics: original,
        },
        optimized_route: VoyageRoute {
            route: plan.route,
            metrics: optimized,
        },
        hazards: plan.hazards,
        hazard_source: plan.hazard_source,
        summary,
        recommendation: Recommendation::UseOptimized,
        preferences: request.preferences.unwrap_or_default(),
    })
}

fn direct_route(origin: &RouteEndpoint, destination: &RouteEndpoint) -> Route {
    let waypoint = |point: GeoPoint, role: WaypointRole, name: &Option<String>, fallback: &str| {
        Waypoint::new(point, role).named(name.clone().unwrap_or_else(|| fallback.to_string()))
    };
    Route::direct(
        waypoint(origin.position, WaypointRole::Origin, &origin.name, "Origin"),
        waypoint(
            destination.position,
            WaypointRole::Destination,
            &destination.name,
            "Destination",
        ),
    )
}
