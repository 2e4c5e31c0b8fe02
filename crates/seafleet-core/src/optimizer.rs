//! Fleet assignment optimizer.
//!
//! Greedy, priority-first matching of vessels to projects. Projects are taken
//! in descending priority (earliest start, then id, on ties) and each one gets
//! the best-scoring eligible vessel not already assigned in the same pass.
//! Existing commitments are kept as-is; conflicts are reported as warnings for
//! a dispatcher to resolve, never by silently reassigning a vessel.

use crate::error::{CoreError, Result};
use crate::geodesy::distance_nm;
use crate::models::{Assignment, AssignmentStatus, Priority, Project, TimeWindow, Vessel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ========== SCORING ==========

/// Estimated travel from a vessel's position to a project site.
pub trait TravelCostModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn travel_nm(&self, vessel: &Vessel, project: &Project) -> f64;
}

/// Great-circle distance as a fast proxy for the sea route, applied to every pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreatCircleCost;

impl TravelCostModel for GreatCircleCost {
    fn name(&self) -> &'static str {
        "great-circle"
    }

    fn travel_nm(&self, vessel: &Vessel, project: &Project) -> f64 {
        distance_nm(vessel.position, project.location)
    }
}

pub trait CandidateScorer: Send + Sync {
    /// Higher is better. `max_travel_nm` is the largest travel among the
    /// project's eligible candidates.
    fn score(&self, priority: Priority, travel_nm: f64, max_travel_nm: f64) -> f64;
}

/// `weight / (1 + travel / max_travel)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScore;

impl CandidateScorer for CompositeScore {
    fn score(&self, priority: Priority, travel_nm: f64, max_travel_nm: f64) -> f64 {
        let normalized = if max_travel_nm > 0.0 {
            travel_nm / max_travel_nm
        } else {
            0.0
        };
        priority.weight() / (1.0 + normalized)
    }
}

// ========== RESULT MODELS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// No vessel of a required type exists in the fleet.
    NoEligibleVessel,
    /// Vessels of the right type exist but all are committed.
    AllCandidatesBusy,
    /// A higher-priority project is blocked by a retained lower-priority commitment.
    RetentionConflict,
    /// Two existing assignments hold the same vessel over overlapping windows.
    ScheduleConflict,
    /// An existing assignment names a vessel or project not in the request.
    UnknownReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationWarning {
    pub kind: WarningKind,
    pub message: String,
    pub related_ids: Vec<String>,
}

impl OptimizationWarning {
    fn new(kind: WarningKind, message: String, related_ids: Vec<String>) -> Self {
        Self {
            kind,
            message,
            related_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselUtilization {
    pub vessel_id: String,
    pub assigned_hours: f64,
    /// Share of the planning horizon the vessel is committed, in `[0, 1]`.
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationEstimates {
    pub travel_cost_model: String,
    pub total_travel_nm: f64,
    pub total_fuel_liters: f64,
    pub total_cost_usd: f64,
    pub vessel_utilization: Vec<VesselUtilization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Retained assignments in input order, then new ones in processing order.
    pub assignments: Vec<Assignment>,
    pub unassigned_projects: Vec<Project>,
    pub warnings: Vec<OptimizationWarning>,
    pub estimates: OptimizationEstimates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Instant used to decide which existing assignments have elapsed. Defaults to now.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    pub fuel_price_usd_per_liter: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            as_of: None,
            fuel_price_usd_per_liter: 0.85,
        }
    }
}

// ========== OPTIMIZER ==========

pub struct FleetOptimizer {
    travel: Box<dyn TravelCostModel>,
    scorer: Box<dyn CandidateScorer>,
    config: OptimizerConfig,
}

impl Default for FleetOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

struct Candidate<'a> {
    vessel: &'a Vessel,
    travel_nm: f64,
}

struct Commitment {
    assignment_id: String,
    project_id: String,
    window: TimeWindow,
}

impl FleetOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            travel: Box::new(GreatCircleCost),
            scorer: Box::new(CompositeScore),
            config,
        }
    }

    pub fn with_travel_model(mut self, travel: Box<dyn TravelCostModel>) -> Self {
        self.travel = travel;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn CandidateScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Propose a complete schedule. Fails only on malformed input, never partially.
    pub fn optimize(
        &self,
        vessels: &[Vessel],
        projects: &[Project],
        existing: &[Assignment],
    ) -> Result<OptimizationResult> {
        validate(vessels, projects, existing)?;
        let as_of = self.config.as_of.unwrap_or_else(Utc::now);

        let vessels_by_id: HashMap<&str, &Vessel> =
            vessels.iter().map(|v| (v.id.as_str(), v)).collect();
        let projects_by_id: HashMap<&str, &Project> =
            projects.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut warnings = Vec::new();
        let retained: Vec<Assignment> = existing
            .iter()
            .filter(|a| a.status.is_committed() && !a.window.has_elapsed(as_of))
            .cloned()
            .collect();
        tracing::debug!(
            existing = existing.len(),
            retained = retained.len(),
            "existing assignments filtered"
        );

        for assignment in &retained {
            let missing: Vec<&str> = [
                (!vessels_by_id.contains_key(assignment.vessel_id.as_str()))
                    .then_some(assignment.vessel_id.as_str()),
                (!projects_by_id.contains_key(assignment.project_id.as_str()))
                    .then_some(assignment.project_id.as_str()),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !missing.is_empty() {
                warnings.push(OptimizationWarning::new(
                    WarningKind::UnknownReference,
                    format!(
                        "assignment {} references unknown {}; retained as-is",
                        assignment.id,
                        missing.join(", ")
                    ),
                    std::iter::once(assignment.id.clone())
                        .chain(missing.iter().map(|id| id.to_string()))
                        .collect(),
                ));
            }
        }
        warnings.extend(schedule_conflicts(&retained));

        let mut commitments: HashMap<&str, Vec<Commitment>> = HashMap::new();
        let mut covered: HashSet<&str> = HashSet::new();
        for assignment in &retained {
            commitments
                .entry(assignment.vessel_id.as_str())
                .or_default()
                .push(Commitment {
                    assignment_id: assignment.id.clone(),
                    project_id: assignment.project_id.clone(),
                    window: assignment.window,
                });
            covered.insert(assignment.project_id.as_str());
        }

        let mut used_ids: HashSet<String> = existing.iter().map(|a| a.id.clone()).collect();
        let mut assigned_in_pass: HashSet<&str> = HashSet::new();
        let mut proposed: Vec<(Assignment, f64)> = Vec::new();
        let mut unassigned = Vec::new();

        for project in processing_order(projects) {
            if covered.contains(project.id.as_str()) {
                tracing::debug!(project = %project.id, "project kept by existing assignment");
                continue;
            }

            let typed: Vec<&Vessel> = vessels
                .iter()
                .filter(|v| project.accepts(&v.vessel_type))
                .collect();
            if typed.is_empty() {
                let types: Vec<&str> = project
                    .required_vessel_types
                    .iter()
                    .map(|t| t.as_str())
                    .collect();
                warnings.push(OptimizationWarning::new(
                    WarningKind::NoEligibleVessel,
                    format!(
                        "project {} ({}) needs [{}] but no such vessel is in the fleet",
                        project.id,
                        project.priority,
                        types.join(", ")
                    ),
                    vec![project.id.clone()],
                ));
                unassigned.push(project.clone());
                continue;
            }

            let eligible: Vec<Candidate> = typed
                .iter()
                .filter(|v| !assigned_in_pass.contains(v.id.as_str()))
                .filter(|v| {
                    commitments
                        .get(v.id.as_str())
                        .map_or(true, |held| {
                            !held.iter().any(|c| c.window.overlaps(&project.window))
                        })
                })
                .map(|&vessel| Candidate {
                    vessel,
                    travel_nm: self.travel.travel_nm(vessel, project),
                })
                .collect();

            let Some((vessel, travel_nm)) = self.pick(project.priority, &eligible) else {
                warnings.push(OptimizationWarning::new(
                    WarningKind::AllCandidatesBusy,
                    format!(
                        "project {} ({}): all {} eligible vessel(s) are busy",
                        project.id,
                        project.priority,
                        typed.len()
                    ),
                    std::iter::once(project.id.clone())
                        .chain(typed.iter().map(|v| v.id.clone()))
                        .collect(),
                ));
                warnings.extend(retention_conflicts(
                    project,
                    &typed,
                    &commitments,
                    &projects_by_id,
                ));
                unassigned.push(project.clone());
                continue;
            };

            let id = unique_id(&mut used_ids, &project.id, &vessel.id);
            let utilization = window_utilization(&project.window, travel_nm, vessel.speed_knots());
            tracing::debug!(
                project = %project.id,
                vessel = %vessel.id,
                travel_nm,
                candidates = eligible.len(),
                "vessel assigned"
            );

            commitments
                .entry(vessel.id.as_str())
                .or_default()
                .push(Commitment {
                    assignment_id: id.clone(),
                    project_id: project.id.clone(),
                    window: project.window,
                });
            assigned_in_pass.insert(vessel.id.as_str());
            proposed.push((
                Assignment {
                    id,
                    vessel_id: vessel.id.clone(),
                    project_id: project.id.clone(),
                    window: project.window,
                    status: AssignmentStatus::Scheduled,
                    utilization,
                },
                travel_nm,
            ));
        }

        let estimates = self.estimates(&vessels_by_id, &retained, &proposed, vessels);
        let mut assignments = retained;
        assignments.extend(proposed.into_iter().map(|(assignment, _)| assignment));

        tracing::info!(
            assignments = assignments.len(),
            unassigned = unassigned.len(),
            warnings = warnings.len(),
            "fleet optimization complete"
        );

        Ok(OptimizationResult {
            assignments,
            unassigned_projects: unassigned,
            warnings,
            estimates,
        })
    }

    /// Highest score wins; ties go to the shorter trip, then the lower vessel id.
    fn pick<'v>(&self, priority: Priority, eligible: &[Candidate<'v>]) -> Option<(&'v Vessel, f64)> {
        let max_travel = eligible
            .iter()
            .map(|c| c.travel_nm)
            .fold(0.0_f64, f64::max);
        eligible
            .iter()
            .map(|c| (self.scorer.score(priority, c.travel_nm, max_travel), c))
            .max_by(|(score_a, a), (score_b, b)| {
                score_a
                    .total_cmp(score_b)
                    .then_with(|| b.travel_nm.total_cmp(&a.travel_nm))
                    .then_with(|| b.vessel.id.cmp(&a.vessel.id))
            })
            .map(|(_, c)| (c.vessel, c.travel_nm))
    }

    fn estimates(
        &self,
        vessels_by_id: &HashMap<&str, &Vessel>,
        retained: &[Assignment],
        proposed: &[(Assignment, f64)],
        vessels: &[Vessel],
    ) -> OptimizationEstimates {
        let mut total_travel_nm = 0.0;
        let mut total_fuel_liters = 0.0;
        for (assignment, travel_nm) in proposed {
            total_travel_nm += travel_nm;
            if let Some(vessel) = vessels_by_id.get(assignment.vessel_id.as_str()) {
                total_fuel_liters += travel_nm * vessel.fuel_burn_rate_per_nm();
            }
        }

        let windows: Vec<(&str, TimeWindow)> = retained
            .iter()
            .chain(proposed.iter().map(|(a, _)| a))
            .map(|a| (a.vessel_id.as_str(), a.window))
            .collect();
        let horizon_hours = match (
            windows.iter().map(|(_, w)| w.start).min(),
            windows.iter().map(|(_, w)| w.end).max(),
        ) {
            (Some(start), Some(end)) => TimeWindow::new(start, end).duration_hours(),
            _ => 0.0,
        };

        let vessel_utilization = vessels
            .iter()
            .map(|vessel| {
                let assigned_hours: f64 = windows
                    .iter()
                    .filter(|(id, _)| *id == vessel.id)
                    .map(|(_, w)| w.duration_hours())
                    .sum();
                let utilization = if horizon_hours > 0.0 {
                    (assigned_hours / horizon_hours).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                VesselUtilization {
                    vessel_id: vessel.id.clone(),
                    assigned_hours,
                    utilization,
                }
            })
            .collect();

        OptimizationEstimates {
            travel_cost_model: self.travel.name().to_string(),
            total_travel_nm,
            total_fuel_liters,
            total_cost_usd: total_fuel_liters * self.config.fuel_price_usd_per_liter,
            vessel_utilization,
        }
    }
}

/// Run the default optimizer (great-circle travel, composite score).
pub fn optimize(
    vessels: &[Vessel],
    projects: &[Project],
    existing: &[Assignment],
    config: OptimizerConfig,
) -> Result<OptimizationResult> {
    FleetOptimizer::new(config).optimize(vessels, projects, existing)
}

fn validate(vessels: &[Vessel], projects: &[Project], existing: &[Assignment]) -> Result<()> {
    let mut seen = HashSet::new();
    for vessel in vessels {
        vessel.position.validate()?;
        if !seen.insert(vessel.id.as_str()) {
            return Err(CoreError::InvalidInput(format!("duplicate vessel id {}", vessel.id)));
        }
    }

    let mut seen = HashSet::new();
    for project in projects {
        project.location.validate()?;
        project.window.validate(&project.id)?;
        if !seen.insert(project.id.as_str()) {
            return Err(CoreError::InvalidInput(format!("duplicate project id {}", project.id)));
        }
    }

    for assignment in existing {
        assignment.window.validate(&assignment.id)?;
    }
    Ok(())
}

/// Priority descending, then earliest start, then id.
fn processing_order(projects: &[Project]) -> Vec<&Project> {
    let mut ordered: Vec<&Project> = projects.iter().collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.window.start.cmp(&b.window.start))
            .then_with(|| a.id.cmp(&b.id))
    });
    ordered
}

fn schedule_conflicts(retained: &[Assignment]) -> Vec<OptimizationWarning> {
    let mut warnings = Vec::new();
    for (idx, first) in retained.iter().enumerate() {
        for second in &retained[idx + 1..] {
            if first.vessel_id == second.vessel_id && first.window.overlaps(&second.window) {
                warnings.push(OptimizationWarning::new(
                    WarningKind::ScheduleConflict,
                    format!(
                        "vessel {} is double-booked by {} and {}",
                        first.vessel_id, first.id, second.id
                    ),
                    vec![first.vessel_id.clone(), first.id.clone(), second.id.clone()],
                ));
            }
        }
    }
    warnings
}

/// Commitments to strictly lower-priority projects that keep `project` unassigned.
fn retention_conflicts(
    project: &Project,
    typed: &[&Vessel],
    commitments: &HashMap<&str, Vec<Commitment>>,
    projects_by_id: &HashMap<&str, &Project>,
) -> Vec<OptimizationWarning> {
    let mut warnings = Vec::new();
    for vessel in typed {
        let Some(held) = commitments.get(vessel.id.as_str()) else {
            continue;
        };
        for commitment in held.iter().filter(|c| c.window.overlaps(&project.window)) {
            let Some(holder) = projects_by_id.get(commitment.project_id.as_str()) else {
                continue;
            };
            if holder.priority < project.priority {
                warnings.push(OptimizationWarning::new(
                    WarningKind::RetentionConflict,
                    format!(
                        "vessel {} is held by {} project {} ({}) but needed by {} project {}; reassignment needs confirmation",
                        vessel.id,
                        holder.priority,
                        holder.id,
                        commitment.assignment_id,
                        project.priority,
                        project.id
                    ),
                    vec![
                        project.id.clone(),
                        vessel.id.clone(),
                        commitment.assignment_id.clone(),
                    ],
                ));
            }
        }
    }
    warnings
}

/// Share of the project window left once the vessel has arrived.
fn window_utilization(window: &TimeWindow, travel_nm: f64, speed_knots: f64) -> f64 {
    let window_hours = window.duration_hours();
    if window_hours <= 0.0 || speed_knots <= 0.0 {
        return 0.0;
    }
    let transit_hours = travel_nm / speed_knots;
    ((window_hours - transit_hours) / window_hours).clamp(0.0, 1.0)
}

fn unique_id(used: &mut HashSet<String>, project_id: &str, vessel_id: &str) -> String {
    let base = format!("asg-{project_id}-{vessel_id}");
    let mut id = base.clone();
    let mut suffix = 2;
    while used.contains(&id) {
        id = format!("{base}-{suffix}");
        suffix += 1;
    }
    used.insert(id.clone());
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::GeoPoint;
    use crate::models::VesselType;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()
    }

    fn window(from: u32, to: u32) -> TimeWindow {
        TimeWindow::new(at(from), at(to))
    }

    fn config() -> OptimizerConfig {
        OptimizerConfig {
            as_of: Some(at(1)),
            ..OptimizerConfig::default()
        }
    }

    fn vessel(id: &str, kind: &str, lat: f64, lon: f64) -> Vessel {
        Vessel::new(id, id.to_uppercase(), kind, GeoPoint::new(lat, lon))
    }

    fn project(id: &str, priority: Priority, kinds: &[&str], window: TimeWindow) -> Project {
        Project {
            id: id.to_string(),
            name: id.to_string(),
            location: GeoPoint::new(25.0, 55.0),
            required_vessel_types: kinds.iter().map(|k| VesselType::from(*k)).collect(),
            priority,
            window,
        }
    }

    fn existing(id: &str, vessel_id: &str, project_id: &str, window: TimeWindow) -> Assignment {
        Assignment {
            id: id.to_string(),
            vessel_id: vessel_id.to_string(),
            project_id: project_id.to_string(),
            window,
            status: AssignmentStatus::Scheduled,
            utilization: 1.0,
        }
    }

    fn kinds(result: &OptimizationResult) -> Vec<WarningKind> {
        result.warnings.iter().map(|w| w.kind).collect()
    }

    #[test]
    fn composite_score_prefers_closer_vessels() {
        let scorer = CompositeScore;
        assert_eq!(scorer.score(Priority::Critical, 0.0, 100.0), 4.0);
        assert_eq!(scorer.score(Priority::Critical, 100.0, 100.0), 2.0);
        assert_eq!(scorer.score(Priority::Low, 0.0, 0.0), 1.0);
    }

    #[test]
    fn critical_project_wins_the_only_vessel() {
        let vessels = [vessel("tug-1", "tug", 25.0, 55.0)];
        let projects = [
            project("low", Priority::Low, &["tug"], window(2, 5)),
            project("crit", Priority::Critical, &["tug"], window(10, 12)),
        ];
        let result = optimize(&vessels, &projects, &[], config()).unwrap();

        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].project_id, "crit");
        assert_eq!(result.unassigned_projects, [projects[0].clone()]);
        assert_eq!(kinds(&result), [WarningKind::AllCandidatesBusy]);
    }

    #[test]
    fn picks_the_nearest_of_equal_candidates() {
        let vessels = [
            vessel("far", "dredger", 27.0, 52.0),
            vessel("near", "dredger", 25.1, 55.1),
        ];
        let projects = [project("p1", Priority::High, &["dredger"], window(2, 9))];
        let result = optimize(&vessels, &projects, &[], config()).unwrap();
        assert_eq!(result.assignments[0].vessel_id, "near");
        assert_eq!(result.assignments[0].id, "asg-p1-near");
        assert_eq!(result.assignments[0].status, AssignmentStatus::Scheduled);
    }

    /// Precomputed sea distances per vessel id.
    struct RouteTable(&'static [(&'static str, f64)]);

    impl TravelCostModel for RouteTable {
        fn name(&self) -> &'static str {
            "route-table"
        }

        fn travel_nm(&self, vessel: &Vessel, _project: &Project) -> f64 {
            self.0
                .iter()
                .find(|(id, _)| *id == vessel.id)
                .map_or(f64::MAX, |(_, nm)| *nm)
        }
    }

    struct LongestTrip;

    impl CandidateScorer for LongestTrip {
        fn score(&self, _priority: Priority, travel_nm: f64, _max_travel_nm: f64) -> f64 {
            travel_nm
        }
    }

    #[test]
    fn custom_travel_model_and_scorer_change_the_pick() {
        let vessels = [
            vessel("far", "dredger", 27.0, 52.0),
            vessel("near", "dredger", 25.1, 55.1),
        ];
        let projects = [project("p1", Priority::High, &["dredger"], window(2, 9))];

        // Great-circle "near" is behind a long sea route in the table.
        let table = FleetOptimizer::new(config())
            .with_travel_model(Box::new(RouteTable(&[("far", 40.0), ("near", 310.0)])));
        let result = table.optimize(&vessels, &projects, &[]).unwrap();
        assert_eq!(result.assignments[0].vessel_id, "far");
        assert_eq!(result.estimates.travel_cost_model, "route-table");

        let longest = FleetOptimizer::new(config()).with_scorer(Box::new(LongestTrip));
        let result = longest.optimize(&vessels, &projects, &[]).unwrap();
        assert_eq!(result.assignments[0].vessel_id, "far");
        assert_eq!(result.estimates.travel_cost_model, "great-circle");
    }

    #[test]
    fn missing_type_is_no_eligible_vessel() {
        let vessels = [vessel("tug-1", "tug", 25.0, 55.0)];
        let projects = [project("survey", Priority::Medium, &["survey"], window(2, 3))];
        let result = optimize(&vessels, &projects, &[], config()).unwrap();
        assert!(result.assignments.is_empty());
        assert_eq!(kinds(&result), [WarningKind::NoEligibleVessel]);
        assert_eq!(result.warnings[0].related_ids, ["survey"]);
    }

    #[test]
    fn unknown_vessel_type_matches_by_exact_string() {
        let vessels = [vessel("pont-1", "pontoon", 25.0, 55.0)];
        let projects = [project("p1", Priority::Low, &["pontoon"], window(2, 3))];
        let result = optimize(&vessels, &projects, &[], config()).unwrap();
        assert_eq!(result.assignments.len(), 1);
        assert!(result.estimates.total_fuel_liters >= 0.0);
    }

    #[test]
    fn empty_inputs_are_not_errors() {
        let result = optimize(&[], &[], &[], config()).unwrap();
        assert!(result.assignments.is_empty());
        assert!(result.unassigned_projects.is_empty());

        let projects = [project("p1", Priority::Low, &["tug"], window(2, 3))];
        let result = optimize(&[], &projects, &[], config()).unwrap();
        assert_eq!(result.unassigned_projects.len(), 1);
        assert_eq!(kinds(&result), [WarningKind::NoEligibleVessel]);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let projects = [project("bad", Priority::Low, &["tug"], window(5, 2))];
        let err = optimize(&[], &projects, &[], config()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWindow { ref id, .. } if id == "bad"));
    }

    #[test]
    fn existing_assignment_is_retained_and_blocks_overlap() {
        let vessels = [vessel("tug-1", "tug", 25.0, 55.0)];
        let projects = [
            project("harbour", Priority::Low, &["tug"], window(2, 6)),
            project("salvage", Priority::Critical, &["tug"], window(4, 8)),
        ];
        let assignments = [existing("a-1", "tug-1", "harbour", window(2, 6))];
        let result = optimize(&vessels, &projects, &assignments, config()).unwrap();

        assert_eq!(result.assignments, assignments.to_vec());
        assert_eq!(result.unassigned_projects[0].id, "salvage");
        assert_eq!(
            kinds(&result),
            [WarningKind::AllCandidatesBusy, WarningKind::RetentionConflict]
        );
        assert!(result.warnings[1].related_ids.contains(&"a-1".to_string()));
    }

    #[test]
    fn elapsed_and_cancelled_assignments_are_dropped() {
        let vessels = [vessel("tug-1", "tug", 25.0, 55.0)];
        let projects = [project("p1", Priority::High, &["tug"], window(5, 8))];
        let mut cancelled = existing("a-2", "tug-1", "p1", window(5, 8));
        cancelled.status = AssignmentStatus::Cancelled;
        let config = OptimizerConfig {
            as_of: Some(at(3)),
            ..OptimizerConfig::default()
        };
        let assignments = [existing("a-1", "tug-1", "old", window(1, 2)), cancelled];
        let result = optimize(&vessels, &projects, &assignments, config).unwrap();

        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].id, "asg-p1-tug-1");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn overlapping_inputs_and_unknown_ids_are_flagged() {
        let vessels = [vessel("tug-1", "tug", 25.0, 55.0)];
        let projects = [project("p1", Priority::High, &["tug"], window(2, 5))];
        let assignments = [
            existing("a-1", "tug-1", "p1", window(2, 5)),
            existing("a-2", "tug-1", "ghost", window(3, 4)),
        ];
        let result = optimize(&vessels, &projects, &assignments, config()).unwrap();

        assert_eq!(result.assignments.len(), 2);
        assert_eq!(
            kinds(&result),
            [WarningKind::UnknownReference, WarningKind::ScheduleConflict]
        );
    }

    #[test]
    fn utilization_reflects_transit_and_horizon() {
        let vessels = [
            vessel("sup-1", "supply", 25.0, 55.0).with_speed(10.0),
            vessel("sup-2", "supply", 25.0, 55.0),
        ];
        let projects = [project("p1", Priority::Medium, &["supply"], window(2, 4))];
        let result = optimize(&vessels, &projects, &[], config()).unwrap();

        assert_eq!(result.assignments[0].vessel_id, "sup-1");
        assert_eq!(result.assignments[0].utilization, 1.0);
        let usage = &result.estimates.vessel_utilization;
        assert_eq!(usage[0].utilization, 1.0);
        assert_eq!(usage[0].assigned_hours, 48.0);
        assert_eq!(usage[1].utilization, 0.0);
        assert_eq!(result.estimates.travel_cost_model, "great-circle");
    }

    #[test]
    fn window_utilization_subtracts_transit() {
        let utilization = window_utilization(&window(2, 3), 120.0, 10.0);
        assert!((utilization - 0.5).abs() < 1e-9);
        assert_eq!(window_utilization(&window(2, 3), 1000.0, 10.0), 0.0);
    }
}
