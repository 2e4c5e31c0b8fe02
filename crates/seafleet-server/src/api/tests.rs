use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use seafleet_core::WaypointNetwork;

use crate::{api, config::Config, state::AppState};

fn test_config() -> Config {
    Config {
        synthetic_hazards: false,
        ..Config::offline()
    }
}

fn setup_app() -> Router {
    let state = Arc::new(AppState::new(test_config()).expect("state"));
    api::app(state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn route_request(origin_lat: f64) -> Value {
    json!({
        "vessel": {
            "id": "v-1",
            "name": "Gulf Runner",
            "type": "supply",
            "position": { "lat": 24.45, "lng": 54.37 },
            "speed": 10.0
        },
        "origin": { "lat": origin_lat, "lng": 54.3773, "name": "Abu Dhabi" },
        "destination": { "lat": 25.2697, "lng": 55.3095, "name": "Dubai Maritime" },
        "preferences": { "prioritize": "safety" }
    })
}

#[tokio::test]
async fn health_echoes_request_id() {
    let app = setup_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn optimize_route_returns_both_routes() {
    let app = setup_app();
    let response = app
        .oneshot(post_json("/v1/routes/optimize", route_request(24.4539)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = read_json(response).await;
    assert_eq!(body["original_route"]["source"], "direct");
    assert_eq!(body["optimized_route"]["source"], "network");
    assert_eq!(body["recommendation"], "use_optimized");
    assert_eq!(body["hazard_source"], "unavailable");
    assert_eq!(body["preferences"]["prioritize"], "safety");
    assert_eq!(body["optimized_route"]["waypoints"][0]["name"], "Abu Dhabi");
    assert!(body["summary"]["distance_delta_nm"].as_f64().unwrap() >= 0.0);
    assert!(body["optimized_route"]["metrics"]["estimated_fuel_liters"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn invalid_coordinate_is_bad_request() {
    let app = setup_app();
    let response = app
        .oneshot(post_json("/v1/routes/optimize", route_request(95.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "InvalidCoordinate");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = setup_app();
    let response = app
        .oneshot(post_json("/v1/routes/optimize", json!({ "vessel": "nope" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn unreachable_route_is_unprocessable() {
    let network = Arc::new(WaypointNetwork::builder().build().unwrap());
    let state = Arc::new(AppState::with_network(test_config(), network).unwrap());
    let response = api::app(state)
        .oneshot(post_json("/v1/routes/optimize", route_request(24.4539)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["error"], "RouteUnreachable");
}

fn project(id: &str, priority: &str, kind: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Project {id}"),
        "location": { "lat": 25.1, "lng": 55.1 },
        "required_vessel_types": [kind],
        "priority": priority,
        "window": { "start": start, "end": end }
    })
}

#[tokio::test]
async fn fleet_optimize_assigns_by_priority() {
    let app = setup_app();
    let request = json!({
        "vessels": [
            { "id": "tug-1", "name": "Harbour Tug", "type": "tug", "position": { "lat": 25.0, "lng": 55.0 } },
            { "id": "sup-1", "name": "Gulf Supply", "type": "supply", "position": { "lat": 24.5, "lng": 54.4 } }
        ],
        "projects": [
            project("medium-tug", "medium", "tug", "2026-05-03T00:00:00Z", "2026-05-06T00:00:00Z"),
            project("high-supply", "high", "supply", "2026-05-02T00:00:00Z", "2026-05-05T00:00:00Z"),
            project("critical-tug", "critical", "tug", "2026-05-04T00:00:00Z", "2026-05-07T00:00:00Z")
        ],
        "assignments": [],
        "as_of": "2026-05-01T00:00:00Z"
    });

    let response = app
        .oneshot(post_json("/v1/fleet/optimize", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let assignments = body["assignments"].as_array().unwrap();
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0]["project_id"], "critical-tug");
    assert_eq!(assignments[0]["vessel_id"], "tug-1");
    assert_eq!(body["unassigned_projects"][0]["id"], "medium-tug");
    assert_eq!(body["warnings"][0]["kind"], "AllCandidatesBusy");
}

#[tokio::test]
async fn fleet_optimize_rejects_inverted_window() {
    let app = setup_app();
    let request = json!({
        "vessels": [],
        "projects": [
            project("broken", "low", "tug", "2026-05-05T00:00:00Z", "2026-05-01T00:00:00Z")
        ]
    });

    let response = app
        .oneshot(post_json("/v1/fleet/optimize", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "InvalidWindow");
    assert!(body["message"].as_str().unwrap().contains("broken"));
}

#[tokio::test]
async fn network_lists_gulf_dataset() {
    let app = setup_app();
    let response = app
        .oneshot(Request::builder().uri("/v1/network").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 22);
    assert_eq!(body["edges"].as_array().unwrap().len(), 25);
    assert_eq!(body["landmasses"].as_array().unwrap().len(), 3);
}
