//! The flow-solver collaborator boundary.
//!
//! The engines treat the power-flow solve as an opaque, blocking call: give
//! it a snapshot, get back per-line real-power flows and a convergence flag.
//! Anything that satisfies [`FlowSolver`] plugs in: an iterative
//! Newton-Raphson implementation, the bundled [`DcFlowSolver`], or a
//! scripted stub in tests, without touching classification or diffing
//! logic.
//!
//! [`DcFlowSolver`] solves the linearized system `B' theta = P` per
//! connected component of the active-line subgraph (each component gets its
//! own reference bus), then recovers branch flows as
//! `(theta_from - theta_to) / x`. Solving per component keeps islanded
//! snapshots well-posed instead of failing on a singular matrix.

use anyhow::{anyhow, Result as AnyResult};
use gre_core::{
    active_components, BusId, FaerSolver, GridResult, LinearSystemBackend, Network, Node,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Which solve the collaborator should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Full non-linear solve (default)
    NonLinear,
    /// Linearized approximation; faster, and the fallback after a
    /// non-convergent non-linear attempt
    Linear,
}

/// Per-line flows from one solve of one snapshot.
///
/// Flows are signed real power (MW) in the line's from->to direction, keyed
/// by line name. Lines absent from the map carried no solved flow.
#[derive(Debug, Clone, Default)]
pub struct FlowSolution {
    pub flows_mw: HashMap<String, f64>,
    pub converged: bool,
    /// Solver-reported error metric, when the implementation is iterative
    pub max_error: Option<f64>,
}

/// Narrow interface to the external flow-solver collaborator.
pub trait FlowSolver: Send + Sync {
    fn solve(&self, network: &Network, mode: SolveMode) -> GridResult<FlowSolution>;
}

/// Convergence metadata recorded on every analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct SolveInfo {
    pub converged: bool,
    /// True when the numbers come from the linear approximation
    pub linear: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run one solve with the single permitted retry.
///
/// A non-convergent (or outright failed) non-linear solve is retried once
/// in linear mode; the returned metadata then records `converged = false,
/// linear = true`. This never errors: if both modes fail the solution is
/// empty and the failure reason lands in [`SolveInfo::error`], so the
/// caller still produces a complete, flagged result set.
pub fn solve_with_fallback(
    solver: &dyn FlowSolver,
    network: &Network,
    prefer_linear: bool,
) -> (FlowSolution, SolveInfo) {
    if prefer_linear {
        return match solver.solve(network, SolveMode::Linear) {
            Ok(solution) => {
                let info = SolveInfo {
                    converged: solution.converged,
                    linear: true,
                    max_error: solution.max_error,
                    error: None,
                };
                (solution, info)
            }
            Err(err) => failed_solve(format!("linear solve failed: {err}")),
        };
    }

    let nonlinear_failure = match solver.solve(network, SolveMode::NonLinear) {
        Ok(solution) if solution.converged => {
            let info = SolveInfo {
                converged: true,
                linear: false,
                max_error: solution.max_error,
                error: None,
            };
            return (solution, info);
        }
        Ok(_) => "non-linear solve did not converge".to_string(),
        Err(err) => format!("non-linear solve failed: {err}"),
    };

    warn!("{nonlinear_failure}; retrying with linear approximation");
    match solver.solve(network, SolveMode::Linear) {
        Ok(solution) => {
            let info = SolveInfo {
                converged: false,
                linear: true,
                max_error: solution.max_error,
                error: Some(nonlinear_failure),
            };
            (solution, info)
        }
        Err(err) => failed_solve(format!("{nonlinear_failure}; linear fallback failed: {err}")),
    }
}

fn failed_solve(reason: String) -> (FlowSolution, SolveInfo) {
    warn!("{reason}");
    (
        FlowSolution::default(),
        SolveInfo {
            converged: false,
            linear: true,
            max_error: None,
            error: Some(reason),
        },
    )
}

/// DC power-flow approximation of the collaborator contract.
///
/// Linearizes the AC equations (angles small, voltages 1.0 pu, losses
/// ignored) and solves the bus susceptance system once per energizable
/// component. Both solve modes run the same linearized solve; a DC result
/// is its own linear approximation.
pub struct DcFlowSolver {
    backend: Box<dyn LinearSystemBackend>,
}

impl Default for DcFlowSolver {
    fn default() -> Self {
        Self {
            backend: Box::new(FaerSolver),
        }
    }
}

impl DcFlowSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific linear-system backend.
    pub fn with_backend(backend: Box<dyn LinearSystemBackend>) -> Self {
        Self { backend }
    }

    fn dc_flows(&self, network: &Network) -> AnyResult<HashMap<String, f64>> {
        let injections = bus_injections_mw(network);
        let gen_buses: std::collections::HashSet<BusId> = network
            .generators()
            .into_iter()
            .filter(|gen| gen.status)
            .map(|gen| gen.bus)
            .collect();
        let mut angles: HashMap<BusId, f64> = HashMap::new();

        for component in active_components(network) {
            // A component with no in-service generation is de-energized;
            // its lines carry nothing, so pin every angle instead of
            // inventing a slack source out of thin air.
            if component.len() == 1 || !component.iter().any(|bus| gen_buses.contains(bus)) {
                for &bus in &component {
                    angles.insert(bus, 0.0);
                }
                continue;
            }

            let index: HashMap<BusId, usize> = component
                .iter()
                .enumerate()
                .map(|(i, &bus)| (bus, i))
                .collect();
            let n = component.len();

            // B': each active line adds +1/x on the diagonal, -1/x off it.
            let mut susceptance = vec![vec![0.0; n]; n];
            for line in network.lines() {
                if !line.active {
                    continue;
                }
                let (Some(&i), Some(&j)) = (index.get(&line.from_bus), index.get(&line.to_bus))
                else {
                    continue;
                };
                let b = 1.0 / effective_reactance(line.reactance);
                susceptance[i][j] -= b;
                susceptance[j][i] -= b;
                susceptance[i][i] += b;
                susceptance[j][j] += b;
            }

            // The component's first bus is the reference (angle 0); drop its
            // row and column so the reduced system is non-singular.
            let mut reduced = vec![vec![0.0; n - 1]; n - 1];
            let mut rhs = vec![0.0; n - 1];
            for i in 1..n {
                for j in 1..n {
                    reduced[i - 1][j - 1] = susceptance[i][j];
                }
                rhs[i - 1] = injections.get(&component[i]).copied().unwrap_or(0.0);
            }

            let solution = self
                .backend
                .solve(&reduced, &rhs)
                .map_err(|err| anyhow!("DC solve failed for component of {n} buses: {err}"))?;

            angles.insert(component[0], 0.0);
            for (i, &bus) in component.iter().enumerate().skip(1) {
                angles.insert(bus, solution[i - 1]);
            }
        }

        let mut flows = HashMap::new();
        for line in network.lines() {
            let flow = if line.active {
                let theta_from = angles.get(&line.from_bus).copied().unwrap_or(0.0);
                let theta_to = angles.get(&line.to_bus).copied().unwrap_or(0.0);
                (theta_from - theta_to) / effective_reactance(line.reactance)
            } else {
                0.0
            };
            flows.insert(line.name.clone(), flow);
        }
        Ok(flows)
    }
}

impl FlowSolver for DcFlowSolver {
    fn solve(&self, network: &Network, _mode: SolveMode) -> GridResult<FlowSolution> {
        let flows_mw = self
            .dc_flows(network)
            .map_err(|err| gre_core::GridError::Solver(err.to_string()))?;
        Ok(FlowSolution {
            flows_mw,
            converged: true,
            max_error: None,
        })
    }
}

/// Net MW injection per bus: in-service generation minus load.
fn bus_injections_mw(network: &Network) -> HashMap<BusId, f64> {
    let mut injections = HashMap::new();
    for node in network.graph.node_weights() {
        match node {
            Node::Gen(gen) if gen.status => {
                *injections.entry(gen.bus).or_insert(0.0) += gen.active_power.value();
            }
            Node::Load(load) => {
                *injections.entry(load.bus).or_insert(0.0) -= load.active_power.value();
            }
            _ => {}
        }
    }
    injections
}

fn effective_reactance(reactance: f64) -> f64 {
    reactance.abs().max(1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{networks, ScriptedSolver};

    #[test]
    fn test_dc_flow_radial_chain() {
        // gen 100 MW at bus 1, load 100 MW at bus 3: both lines carry 100 MW
        let network = networks::radial_chain(100.0);
        let solver = DcFlowSolver::new();
        let solution = solver.solve(&network, SolveMode::NonLinear).unwrap();
        assert!(solution.converged);
        assert!((solution.flows_mw["L1"] - 100.0).abs() < 1e-6);
        assert!((solution.flows_mw["L2"] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_dc_flow_parallel_split_by_inverse_reactance() {
        // Two parallel lines, x = 0.1 and 0.2: flow splits 2:1.
        let network = networks::parallel_pair(90.0);
        let solution = DcFlowSolver::new()
            .solve(&network, SolveMode::NonLinear)
            .unwrap();
        assert!((solution.flows_mw["A"] - 60.0).abs() < 1e-6);
        assert!((solution.flows_mw["B"] - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_dc_flow_islanded_snapshot_still_solves() {
        let mut network = networks::radial_chain(100.0);
        network.deactivate_line("L2");
        let solution = DcFlowSolver::new()
            .solve(&network, SolveMode::NonLinear)
            .unwrap();
        assert!(solution.converged);
        // Outaged line carries nothing; the surviving line feeds nothing
        // downstream of bus 2, so it also carries nothing.
        assert_eq!(solution.flows_mw["L2"], 0.0);
        assert!((solution.flows_mw["L1"]).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_records_linear_after_nonconvergence() {
        let solver = ScriptedSolver::failing_nonlinear([("L1", 50.0)]);
        let network = networks::radial_chain(50.0);
        let (solution, info) = solve_with_fallback(&solver, &network, false);
        assert!(!info.converged);
        assert!(info.linear);
        assert!(info.error.as_deref().unwrap_or("").contains("converge"));
        assert!((solution.flows_mw["L1"] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_not_taken_when_converged() {
        let solver = ScriptedSolver::constant([("L1", 50.0)]);
        let network = networks::radial_chain(50.0);
        let (_, info) = solve_with_fallback(&solver, &network, false);
        assert!(info.converged);
        assert!(!info.linear);
        assert!(info.error.is_none());
    }

    #[test]
    fn test_prefer_linear_skips_nonlinear() {
        let solver = ScriptedSolver::failing_nonlinear([("L1", 50.0)]);
        let network = networks::radial_chain(50.0);
        let (_, info) = solve_with_fallback(&solver, &network, true);
        // Linear-only request: the scripted solver converges in linear mode.
        assert!(info.converged);
        assert!(info.linear);
    }

    #[test]
    fn test_total_failure_returns_flagged_empty_result() {
        let solver = ScriptedSolver::always_failing();
        let network = networks::radial_chain(50.0);
        let (solution, info) = solve_with_fallback(&solver, &network, false);
        assert!(!info.converged);
        assert!(solution.flows_mw.is_empty());
        assert!(info.error.is_some());
    }
}
