//! Plain-text rendering of server responses.

use serde_json::Value;
use std::fmt::Write;

use seafleet_core::OptimizationResult;

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or("-")
}

pub fn voyage_plan(plan: &Value) -> String {
    let mut out = String::new();
    let optimized = &plan["optimized_route"];
    let original = &plan["original_route"];
    let summary = &plan["summary"];

    let _ = writeln!(
        out,
        "Vessel {} at {:.1} kn ({} route, hazards: {})",
        text(&plan["vessel_id"]),
        number(&plan["speed_knots"]),
        text(&optimized["source"]),
        text(&plan["hazard_source"]),
    );
    for (idx, waypoint) in optimized["waypoints"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        let _ = write!(
            out,
            "  {:>2}. {:<28} {:>8.4} {:>9.4}  {}",
            idx + 1,
            text(&waypoint["name"]),
            number(&waypoint["lat"]),
            number(&waypoint["lon"]),
            text(&waypoint["role"]),
        );
        if let Some(note) = waypoint["note"].as_str() {
            let _ = write!(out, "  ({note})");
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Direct:    {:>8.1} nm {:>7.1} h {:>9.0} L ${:.0}",
        number(&original["metrics"]["distance_nm"]),
        number(&original["metrics"]["estimated_duration_hours"]),
        number(&original["metrics"]["estimated_fuel_liters"]),
        number(&original["metrics"]["estimated_cost_usd"]),
    );
    let _ = writeln!(
        out,
        "Optimized: {:>8.1} nm {:>7.1} h {:>9.0} L ${:.0}",
        number(&optimized["metrics"]["distance_nm"]),
        number(&optimized["metrics"]["estimated_duration_hours"]),
        number(&optimized["metrics"]["estimated_fuel_liters"]),
        number(&optimized["metrics"]["estimated_cost_usd"]),
    );
    let _ = writeln!(
        out,
        "Hazards avoided: {}, land crossings avoided: {}, safety improvement: {}",
        summary["hazards_avoided"].as_u64().unwrap_or(0),
        summary["land_crossings_avoided"].as_u64().unwrap_or(0),
        text(&summary["safety_improvement"]),
    );
    out
}

pub fn optimization(result: &OptimizationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Assignments ({}):", result.assignments.len());
    for assignment in &result.assignments {
        let _ = writeln!(
            out,
            "  {:<24} {:<12} -> {:<20} {} .. {}  util {:.0}%",
            assignment.id,
            assignment.vessel_id,
            assignment.project_id,
            assignment.window.start.format("%Y-%m-%d %H:%M"),
            assignment.window.end.format("%Y-%m-%d %H:%M"),
            assignment.utilization * 100.0,
        );
    }
    if !result.unassigned_projects.is_empty() {
        let _ = writeln!(out, "Unassigned ({}):", result.unassigned_projects.len());
        for project in &result.unassigned_projects {
            let _ = writeln!(out, "  {} [{}]", project.id, project.priority);
        }
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "warning: {:?}: {}", warning.kind, warning.message);
    }
    let estimates = &result.estimates;
    let _ = writeln!(
        out,
        "Travel {:.1} nm, fuel {:.0} L, cost ${:.0} ({})",
        estimates.total_travel_nm,
        estimates.total_fuel_liters,
        estimates.total_cost_usd,
        estimates.travel_cost_model,
    );
    out
}

pub fn network(network: &Value) -> String {
    let empty = Vec::new();
    let nodes = network["nodes"].as_array().unwrap_or(&empty);
    let edges = network["edges"].as_array().unwrap_or(&empty);
    let landmasses = network["landmasses"].as_array().unwrap_or(&empty);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} nodes, {} edges, {} landmasses",
        nodes.len(),
        edges.len(),
        landmasses.len()
    );
    for node in nodes {
        let _ = write!(
            out,
            "  {:<28} {:>8.4} {:>9.4}",
            text(&node["name"]),
            number(&node["position"]["lat"]),
            number(&node["position"]["lon"]),
        );
        if let Some(note) = node["note"].as_str() {
            let _ = write!(out, "  {note}");
        }
        out.push('\n');
    }
    for landmass in landmasses {
        let _ = writeln!(out, "  land: {}", text(&landmass["name"]));
    }
    out
}
