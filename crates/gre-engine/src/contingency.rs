//! N-k outage simulation.
//!
//! Each simulation builds two fresh snapshots from the engine's source
//! topology: a baseline with every line as sourced, and a modified snapshot
//! with the requested lines out of service (active flag cleared, flow
//! forced to zero). Both are solved through the flow-solver collaborator,
//! then diffed line by line. The source topology is never mutated; snapshot
//! ownership is exclusive to the call.
//!
//! Unknown line names are rejected before any solve, with the full valid
//! name set in the error. Solver trouble is never fatal: a non-convergent
//! solve falls back to the linear mode once and the result is flagged.

use crate::classify::{loading_percent, StressLevel};
use crate::solver::{solve_with_fallback, FlowSolution, FlowSolver, SolveInfo};
use gre_core::{islanded_buses, BusId, GridError, GridResult, IslandedBus, Megawatts, Network};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Loading change (percentage points) above which a line counts as affected.
pub const AFFECTED_CHANGE_THRESHOLD_PCT: f64 = 10.0;

/// Before/after state of one line across an outage simulation.
#[derive(Debug, Clone, Serialize)]
pub struct LineImpact {
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub s_nom_mva: f64,
    pub flow_mw: f64,
    pub flow_mva: f64,
    pub loading_pct: Option<f64>,
    pub baseline_loading_pct: Option<f64>,
    /// `after - before`, in percentage points
    pub loading_change_pct: Option<f64>,
    pub is_active: bool,
    pub is_outaged: bool,
    pub stress: StressLevel,
}

/// Aggregate metrics over the surviving (active, non-outaged) lines.
#[derive(Debug, Clone, Serialize)]
pub struct ContingencyMetrics {
    pub total_lines: usize,
    pub outaged_count: usize,
    pub active_count: usize,
    pub overloaded_count: usize,
    pub high_stress_count: usize,
    pub affected_count: usize,
    pub islanded_count: usize,
    pub max_loading_pct: Option<f64>,
    pub avg_loading_pct: Option<f64>,
    pub max_loading_increase_pct: Option<f64>,
    pub baseline_max_loading_pct: Option<f64>,
    pub baseline_avg_loading_pct: Option<f64>,
}

/// Everything a caller learns from one outage simulation. Immutable once
/// returned.
#[derive(Debug, Clone, Serialize)]
pub struct ContingencyResult {
    pub outage_lines: Vec<String>,
    /// Every line of the topology, in source order
    pub line_impacts: Vec<LineImpact>,
    /// Active lines at or above 100%, worst first
    pub overloaded: Vec<LineImpact>,
    /// Active lines in the 90-100% band, worst first
    pub high_stress: Vec<LineImpact>,
    /// Any line whose loading moved by more than the affected threshold,
    /// largest move first
    pub affected: Vec<LineImpact>,
    pub islanded_buses: Vec<IslandedBus>,
    pub metrics: ContingencyMetrics,
    pub baseline_solve: SolveInfo,
    pub outage_solve: SolveInfo,
}

/// An outage candidate, for request builders and error recovery.
#[derive(Debug, Clone, Serialize)]
pub struct LineCandidate {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    pub s_nom_mva: f64,
    pub description: String,
}

/// Outcome of one scenario in a batch run.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario_id: usize,
    /// `N-1`, `N-2`, ... by outage order
    pub scenario_kind: String,
    pub outage_lines: Vec<String>,
    pub result: GridResult<ContingencyResult>,
}

/// Simulates line outages against a fixed source topology.
pub struct ContingencyEngine {
    baseline: Network,
    solver: Arc<dyn FlowSolver>,
    power_factor: f64,
    affected_threshold_pct: f64,
}

impl ContingencyEngine {
    pub fn new(baseline: Network, solver: Arc<dyn FlowSolver>) -> Self {
        Self {
            baseline,
            solver,
            power_factor: crate::rating::DEFAULT_POWER_FACTOR,
            affected_threshold_pct: AFFECTED_CHANGE_THRESHOLD_PCT,
        }
    }

    /// Override the assumed power factor for MW -> MVA conversion.
    pub fn with_power_factor(mut self, power_factor: f64) -> Self {
        self.power_factor = power_factor;
        self
    }

    /// Override the affected-line change threshold (percentage points).
    pub fn with_affected_threshold(mut self, threshold_pct: f64) -> Self {
        self.affected_threshold_pct = threshold_pct;
        self
    }

    /// All lines that can be named in an outage request, name-sorted.
    pub fn available_lines(&self) -> Vec<LineCandidate> {
        let mut candidates: Vec<LineCandidate> = self
            .baseline
            .lines()
            .into_iter()
            .map(|line| {
                let bus0 = self.bus_label(line.from_bus);
                let bus1 = self.bus_label(line.to_bus);
                LineCandidate {
                    description: format!("{} | {} - {}", line.name, bus0, bus1),
                    name: line.name.clone(),
                    bus0,
                    bus1,
                    s_nom_mva: line.s_nom.value(),
                }
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }

    /// Simulate removing `outage_lines` from service and re-solving.
    ///
    /// An empty outage set is a valid request and reproduces the baseline
    /// classifications exactly.
    pub fn simulate_outage(
        &self,
        outage_lines: &[String],
        use_linear: bool,
    ) -> GridResult<ContingencyResult> {
        let valid = self.baseline.line_names();
        let valid_set: HashSet<&str> = valid.iter().map(String::as_str).collect();
        let unknown: Vec<String> = outage_lines
            .iter()
            .filter(|name| !valid_set.contains(name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(GridError::UnknownLines { unknown, valid });
        }

        info!(outages = ?outage_lines, "simulating line outage");

        let baseline = self.baseline.clone();
        let (baseline_solution, baseline_solve) =
            solve_with_fallback(self.solver.as_ref(), &baseline, use_linear);
        let baseline_loading = self.loading_by_line(&baseline, &baseline_solution);

        let mut modified = self.baseline.clone();
        for name in outage_lines {
            modified.deactivate_line(name);
        }
        let (outage_solution, outage_solve) =
            solve_with_fallback(self.solver.as_ref(), &modified, use_linear);

        let outaged: HashSet<&str> = outage_lines.iter().map(String::as_str).collect();
        let mut line_impacts = Vec::new();
        for line in modified.lines() {
            let is_outaged = outaged.contains(line.name.as_str());
            let is_active = line.active;
            let flow_mw = if is_active {
                outage_solution
                    .flows_mw
                    .get(&line.name)
                    .copied()
                    .unwrap_or(0.0)
                    .abs()
            } else {
                0.0
            };
            let flow_mva = Megawatts(flow_mw).to_apparent(self.power_factor).value();
            let loading_pct = loading_percent(flow_mva, line.s_nom.value());
            let baseline_loading_pct = baseline_loading.get(&line.name).copied().flatten();
            let loading_change_pct = match (loading_pct, baseline_loading_pct) {
                (Some(after), Some(before)) => Some(after - before),
                _ => None,
            };
            let stress = if is_outaged {
                StressLevel::Outaged
            } else {
                StressLevel::from_loading(loading_pct)
            };
            line_impacts.push(LineImpact {
                name: line.name.clone(),
                from_bus: line.from_bus,
                to_bus: line.to_bus,
                s_nom_mva: line.s_nom.value(),
                flow_mw,
                flow_mva,
                loading_pct,
                baseline_loading_pct,
                loading_change_pct,
                is_active,
                is_outaged,
                stress,
            });
        }

        let mut overloaded: Vec<LineImpact> = line_impacts
            .iter()
            .filter(|i| i.is_active && !i.is_outaged && i.stress == StressLevel::Overloaded)
            .cloned()
            .collect();
        let mut high_stress: Vec<LineImpact> = line_impacts
            .iter()
            .filter(|i| i.is_active && !i.is_outaged && i.stress == StressLevel::HighStress)
            .cloned()
            .collect();
        // Affected spans every line, active or not: a forced-to-zero flow is
        // a loading change worth surfacing.
        let mut affected: Vec<LineImpact> = line_impacts
            .iter()
            .filter(|i| {
                i.loading_change_pct
                    .map(|change| change.abs() > self.affected_threshold_pct)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        overloaded.sort_by(|a, b| opt_desc(a.loading_pct, b.loading_pct));
        high_stress.sort_by(|a, b| opt_desc(a.loading_pct, b.loading_pct));
        affected.sort_by(|a, b| {
            opt_desc(
                a.loading_change_pct.map(f64::abs),
                b.loading_change_pct.map(f64::abs),
            )
        });

        let islanded = islanded_buses(&modified);
        let metrics = self.metrics(
            &line_impacts,
            outage_lines.len(),
            overloaded.len(),
            high_stress.len(),
            affected.len(),
            islanded.len(),
        );

        Ok(ContingencyResult {
            outage_lines: outage_lines.to_vec(),
            line_impacts,
            overloaded,
            high_stress,
            affected,
            islanded_buses: islanded,
            metrics,
            baseline_solve,
            outage_solve,
        })
    }

    /// Run a batch of scenarios (N-1, N-2, ...) against the same source
    /// topology. A failing scenario does not stop the batch.
    pub fn run_scenarios(&self, scenarios: &[Vec<String>]) -> Vec<ScenarioOutcome> {
        scenarios
            .iter()
            .enumerate()
            .map(|(i, outage_lines)| {
                info!(
                    scenario = i + 1,
                    total = scenarios.len(),
                    "running contingency scenario"
                );
                ScenarioOutcome {
                    scenario_id: i + 1,
                    scenario_kind: format!("N-{}", outage_lines.len()),
                    outage_lines: outage_lines.clone(),
                    result: self.simulate_outage(outage_lines, false),
                }
            })
            .collect()
    }

    fn bus_label(&self, bus_id: BusId) -> String {
        self.baseline
            .bus(bus_id)
            .map(|bus| bus.name.clone())
            .unwrap_or_else(|| format!("bus-{}", bus_id.value()))
    }

    fn loading_by_line(
        &self,
        network: &Network,
        solution: &FlowSolution,
    ) -> HashMap<String, Option<f64>> {
        network
            .lines()
            .into_iter()
            .map(|line| {
                let flow_mw = if line.active {
                    solution.flows_mw.get(&line.name).copied().unwrap_or(0.0).abs()
                } else {
                    0.0
                };
                let flow_mva = Megawatts(flow_mw).to_apparent(self.power_factor).value();
                (
                    line.name.clone(),
                    loading_percent(flow_mva, line.s_nom.value()),
                )
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn metrics(
        &self,
        impacts: &[LineImpact],
        outaged_count: usize,
        overloaded_count: usize,
        high_stress_count: usize,
        affected_count: usize,
        islanded_count: usize,
    ) -> ContingencyMetrics {
        let surviving: Vec<&LineImpact> = impacts
            .iter()
            .filter(|i| i.is_active && !i.is_outaged)
            .collect();
        let loadings: Vec<f64> = surviving.iter().filter_map(|i| i.loading_pct).collect();
        let baseline: Vec<f64> = surviving
            .iter()
            .filter_map(|i| i.baseline_loading_pct)
            .collect();
        let increases: Vec<f64> = surviving
            .iter()
            .filter_map(|i| i.loading_change_pct)
            .collect();

        ContingencyMetrics {
            total_lines: impacts.len(),
            outaged_count,
            active_count: surviving.len(),
            overloaded_count,
            high_stress_count,
            affected_count,
            islanded_count,
            max_loading_pct: fold_max(&loadings),
            avg_loading_pct: mean(&loadings),
            max_loading_increase_pct: fold_max(&increases),
            baseline_max_loading_pct: fold_max(&baseline),
            baseline_avg_loading_pct: mean(&baseline),
        }
    }
}

fn fold_max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn opt_desc(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    b.unwrap_or(f64::NEG_INFINITY)
        .total_cmp(&a.unwrap_or(f64::NEG_INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::DcFlowSolver;
    use crate::test_support::{networks, ScriptedSolver};

    fn dc_engine(network: Network) -> ContingencyEngine {
        ContingencyEngine::new(network, Arc::new(DcFlowSolver::new()))
    }

    #[test]
    fn test_unknown_line_rejected_with_valid_set() {
        let engine = dc_engine(networks::radial_chain(50.0));
        let err = engine
            .simulate_outage(&["L1".to_string(), "L99".to_string()], false)
            .unwrap_err();
        match err {
            GridError::UnknownLines { unknown, valid } => {
                assert_eq!(unknown, vec!["L99".to_string()]);
                assert_eq!(valid, vec!["L1".to_string(), "L2".to_string()]);
            }
            other => panic!("expected UnknownLines, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_outage_reproduces_baseline() {
        let engine = dc_engine(networks::parallel_pair(90.0));
        let result = engine.simulate_outage(&[], false).unwrap();

        assert!(result.affected.is_empty());
        assert!(result.islanded_buses.is_empty());
        assert_eq!(result.metrics.outaged_count, 0);
        for impact in &result.line_impacts {
            let change = impact.loading_change_pct.unwrap();
            assert!(change.abs() < 1e-9, "spurious change on {}", impact.name);
            assert_eq!(
                StressLevel::from_loading(impact.baseline_loading_pct),
                impact.stress
            );
        }
    }

    #[test]
    fn test_outage_redistributes_to_parallel_line() {
        let engine = dc_engine(networks::parallel_pair(90.0));
        let result = engine.simulate_outage(&["A".to_string()], false).unwrap();

        let a = result.line_impacts.iter().find(|i| i.name == "A").unwrap();
        let b = result.line_impacts.iter().find(|i| i.name == "B").unwrap();
        assert_eq!(a.stress, StressLevel::Outaged);
        assert!(!a.is_active);
        assert_eq!(a.flow_mw, 0.0);
        // B picks up the whole corridor: 60 + 30 -> 90 MW
        assert!((b.flow_mw - 90.0).abs() < 1e-6);
        assert!(b.loading_change_pct.unwrap() > 10.0);
        assert!(result.affected.iter().any(|i| i.name == "B"));
        assert!(result.islanded_buses.is_empty());
    }

    #[test]
    fn test_leaf_bus_islanded_and_line_outaged() {
        let engine = dc_engine(networks::radial_chain(50.0));
        let result = engine.simulate_outage(&["L2".to_string()], false).unwrap();

        assert_eq!(result.islanded_buses.len(), 1);
        assert_eq!(result.islanded_buses[0].bus_id, BusId::new(3));
        assert_eq!(result.metrics.islanded_count, 1);
        let l2 = result.line_impacts.iter().find(|i| i.name == "L2").unwrap();
        assert_eq!(l2.stress, StressLevel::Outaged);
        assert_ne!(l2.stress, StressLevel::Normal);
    }

    #[test]
    fn test_solver_fallback_is_flagged_not_fatal() {
        let solver = ScriptedSolver::failing_nonlinear([("L1", 50.0), ("L2", 50.0)]);
        let engine = ContingencyEngine::new(networks::radial_chain(50.0), Arc::new(solver));
        let result = engine.simulate_outage(&[], false).unwrap();
        assert!(!result.baseline_solve.converged);
        assert!(result.baseline_solve.linear);
        assert!(!result.outage_solve.converged);
    }

    #[test]
    fn test_affected_partition_sorted_by_change() {
        // Baseline solve sees 40/30 MW, outage solve 80/35 MW.
        let solver = ScriptedSolver::constant([("L1", 80.0), ("L2", 35.0)])
            .push([("L1", 40.0), ("L2", 30.0)]);
        let engine = ContingencyEngine::new(networks::radial_chain(50.0), Arc::new(solver));
        let result = engine.simulate_outage(&[], false).unwrap();

        // L1 moved ~42 points, L2 ~5: only L1 is affected.
        assert_eq!(result.affected.len(), 1);
        assert_eq!(result.affected[0].name, "L1");
        assert!(result.metrics.max_loading_increase_pct.unwrap() > 40.0);
    }

    #[test]
    fn test_metrics_over_surviving_lines() {
        let engine = dc_engine(networks::parallel_pair(90.0));
        let result = engine.simulate_outage(&["A".to_string()], false).unwrap();
        assert_eq!(result.metrics.total_lines, 2);
        assert_eq!(result.metrics.outaged_count, 1);
        assert_eq!(result.metrics.active_count, 1);
        // 90 MW / 0.95 / 100 MVA
        assert!((result.metrics.max_loading_pct.unwrap() - 94.74).abs() < 0.01);
        assert_eq!(result.metrics.high_stress_count, 1);
    }

    #[test]
    fn test_run_scenarios_batch_isolates_failures() {
        let engine = dc_engine(networks::radial_chain(50.0));
        let outcomes = engine.run_scenarios(&[
            vec!["L1".to_string()],
            vec!["nope".to_string()],
            vec!["L1".to_string(), "L2".to_string()],
        ]);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].scenario_kind, "N-1");
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[2].scenario_kind, "N-2");
        assert!(outcomes[2].result.is_ok());
    }

    #[test]
    fn test_available_lines_sorted() {
        let engine = dc_engine(networks::parallel_pair(90.0));
        let candidates = engine.available_lines();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "A");
        assert!(candidates[0].description.contains("Bus 1"));
    }
}
