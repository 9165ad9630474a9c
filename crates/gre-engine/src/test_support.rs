//! Shared test doubles and fixture networks.
//!
//! Public so downstream crates can script the solver boundary in their own
//! tests; nothing here is used by the analysis paths.

use crate::solver::{FlowSolution, FlowSolver, SolveMode};
use gre_core::{GridError, GridResult, Network};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A [`FlowSolver`] that replays canned solutions.
///
/// Solutions queued with [`ScriptedSolver::push`] are returned first, in
/// order; once the queue is empty every solve returns the constant
/// solution. Failure modes let tests drive the engines' fallback and
/// flagged-result paths without a real solver.
pub struct ScriptedSolver {
    script: Mutex<VecDeque<FlowSolution>>,
    constant: FlowSolution,
    fail_nonlinear: bool,
    fail_all: bool,
}

impl ScriptedSolver {
    /// Every solve converges and returns the same flows.
    pub fn constant<I>(flows: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            constant: converged_solution(flows),
            fail_nonlinear: false,
            fail_all: false,
        }
    }

    /// Non-linear solves report non-convergence; linear solves succeed with
    /// the given flows.
    pub fn failing_nonlinear<I>(flows: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        Self {
            fail_nonlinear: true,
            ..Self::constant(flows)
        }
    }

    /// Both solve modes error outright.
    pub fn always_failing() -> Self {
        Self {
            fail_all: true,
            ..Self::constant([])
        }
    }

    /// Queue a solution to be returned before the constant one.
    pub fn push<I>(self, flows: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        self.script
            .lock()
            .expect("solver script lock")
            .push_back(converged_solution(flows));
        self
    }

    fn next(&self) -> FlowSolution {
        self.script
            .lock()
            .expect("solver script lock")
            .pop_front()
            .unwrap_or_else(|| self.constant.clone())
    }
}

impl FlowSolver for ScriptedSolver {
    fn solve(&self, _network: &Network, mode: SolveMode) -> GridResult<FlowSolution> {
        if self.fail_all {
            return Err(GridError::Solver("scripted solver failure".into()));
        }
        let mut solution = self.next();
        if mode == SolveMode::NonLinear && self.fail_nonlinear {
            solution.converged = false;
        }
        Ok(solution)
    }
}

fn converged_solution<I>(flows: I) -> FlowSolution
where
    I: IntoIterator<Item = (&'static str, f64)>,
{
    FlowSolution {
        flows_mw: flows
            .into_iter()
            .map(|(name, mw)| (name.to_string(), mw))
            .collect::<HashMap<_, _>>(),
        converged: true,
        max_error: Some(1e-8),
    }
}

/// Small fixture networks used across the engine tests.
pub mod networks {
    use gre_core::{Bus, BusId, Gen, GenId, Kilovolts, Line, LineId, Load, LoadId, Megavars,
        Megawatts, Network};

    fn bus(id: usize, name: &str) -> Bus {
        Bus {
            id: BusId::new(id),
            name: name.to_string(),
            v_nom: Kilovolts(138.0),
            x: id as f64,
            y: 0.0,
        }
    }

    fn load(id: usize, bus: usize, mw: f64) -> Load {
        Load {
            id: LoadId::new(id),
            name: format!("load-{id}"),
            bus: BusId::new(bus),
            active_power: Megawatts(mw),
            reactive_power: Megavars(0.0),
        }
    }

    /// Three buses in a chain: gen at bus 1, load at bus 3.
    /// Lines `L1` (1-2) and `L2` (2-3), both x = 0.1, s_nom = 100 MVA.
    pub fn radial_chain(load_mw: f64) -> Network {
        let mut network = Network::new();
        let b1 = network.add_bus(bus(1, "Bus 1"));
        let b2 = network.add_bus(bus(2, "Bus 2"));
        let b3 = network.add_bus(bus(3, "Bus 3"));
        network.add_gen(
            Gen::new(GenId::new(1), "G1".into(), BusId::new(1)).with_p_set(load_mw),
        );
        network.add_load(load(1, 3, load_mw));
        network.add_line(
            b1,
            b2,
            Line::new(LineId::new(1), "L1".into(), BusId::new(1), BusId::new(2), 0.01, 0.1)
                .with_s_nom(100.0),
        );
        network.add_line(
            b2,
            b3,
            Line::new(LineId::new(2), "L2".into(), BusId::new(2), BusId::new(3), 0.01, 0.1)
                .with_s_nom(100.0),
        );
        network
    }

    /// Two buses joined by parallel lines `A` (x = 0.1) and `B` (x = 0.2);
    /// gen at bus 1 serves `corridor_mw` of load at bus 2. DC splits the
    /// corridor flow 2:1 across A and B.
    pub fn parallel_pair(corridor_mw: f64) -> Network {
        let mut network = Network::new();
        let b1 = network.add_bus(bus(1, "Bus 1"));
        let b2 = network.add_bus(bus(2, "Bus 2"));
        network.add_gen(
            Gen::new(GenId::new(1), "G1".into(), BusId::new(1)).with_p_set(corridor_mw),
        );
        network.add_load(load(1, 2, corridor_mw));
        network.add_line(
            b1,
            b2,
            Line::new(LineId::new(1), "A".into(), BusId::new(1), BusId::new(2), 0.01, 0.1)
                .with_s_nom(100.0),
        );
        network.add_line(
            b1,
            b2,
            Line::new(LineId::new(2), "B".into(), BusId::new(1), BusId::new(2), 0.01, 0.2)
                .with_s_nom(100.0),
        );
        network
    }

    /// Parallel pair A/B between buses 1-2 plus radial spur `C` (2-3)
    /// feeding a generator-less leaf bus.
    pub fn parallel_pair_with_spur(corridor_mw: f64, spur_mw: f64) -> Network {
        let mut network = parallel_pair(corridor_mw);
        let b2 = network.bus_index(BusId::new(2)).expect("bus 2 exists");
        let b3 = network.add_bus(bus(3, "Bus 3"));
        network.add_load(load(2, 3, spur_mw));
        network.add_line(
            b2,
            b3,
            Line::new(LineId::new(3), "C".into(), BusId::new(2), BusId::new(3), 0.01, 0.1)
                .with_s_nom(100.0),
        );
        // Bump the generator so the fixture stays balanced.
        for node in network.graph.node_weights_mut() {
            if let gre_core::Node::Gen(gen) = node {
                gen.active_power = Megawatts(corridor_mw + spur_mw);
            }
        }
        network
    }
}
