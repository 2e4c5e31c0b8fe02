//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use seafleet_core::{
    plan_voyage, Assignment, CoreError, FleetOptimizer, Landmass, NetworkEdge, NetworkNode,
    OptimizationResult, Project, Vessel, VoyagePlan, VoyageRequest,
};

use crate::api::request_id::RequestId;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/routes/optimize", post(optimize_route))
        .route("/v1/fleet/optimize", post(optimize_fleet))
        .route("/v1/network", get(get_network))
}

// ========== ERRORS ==========

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Body(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(CoreError::RouteUnreachable { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Core(_) | ApiError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Core(err) => err.kind(),
            ApiError::Body(_) => "InvalidRequest",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

// ========== ROUTES ==========

async fn optimize_route(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    payload: Result<Json<VoyageRequest>, JsonRejection>,
) -> Result<Json<VoyagePlan>, ApiError> {
    let Json(request) = payload?;
    let plan = plan_voyage(state.engine(), &request, &state.voyage_config())
        .await
        .map_err(|err| {
            tracing::warn!(request_id = %request_id, "route request rejected: {}", err);
            err
        })?;

    tracing::info!(
        vessel = %plan.vessel_id,
        source = ?plan.optimized_route.route.source,
        hazard_source = ?plan.hazard_source,
        distance_nm = plan.optimized_route.metrics.distance_nm,
        "route optimized"
    );
    Ok(Json(plan))
}

// ========== FLEET ==========

#[derive(Debug, Deserialize)]
pub struct FleetOptimizeRequest {
    pub vessels: Vec<Vessel>,
    pub projects: Vec<Project>,
    #[serde(default, alias = "existing_assignments")]
    pub assignments: Vec<Assignment>,
    /// Evaluate retention as of this instant instead of now.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

async fn optimize_fleet(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FleetOptimizeRequest>, JsonRejection>,
) -> Result<Json<OptimizationResult>, ApiError> {
    let Json(request) = payload?;
    let mut config = state.optimizer_config();
    config.as_of = request.as_of;

    let result = FleetOptimizer::new(config).optimize(
        &request.vessels,
        &request.projects,
        &request.assignments,
    )?;

    tracing::info!(
        vessels = request.vessels.len(),
        projects = request.projects.len(),
        assigned = result.assignments.len(),
        unassigned = result.unassigned_projects.len(),
        warnings = result.warnings.len(),
        "fleet optimized"
    );
    Ok(Json(result))
}

// ========== NETWORK ==========

#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub landmasses: Vec<Landmass>,
}

async fn get_network(State(state): State<Arc<AppState>>) -> Json<NetworkResponse> {
    let network = state.network();
    Json(NetworkResponse {
        nodes: network.nodes().to_vec(),
        edges: network.edges(),
        landmasses: network.landmasses().to_vec(),
    })
}
