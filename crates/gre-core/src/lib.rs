//! # gre-core: Transmission Network Modeling Core
//!
//! Provides the data structures and graph-based network model shared by the
//! rating, contingency, and load-scaling engines.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: Buses, Generators (gen), Loads (load)
//! - **Edges**: Transmission lines
//!
//! This graph-based approach enables:
//! - Fast topological queries (generator reachability, island detection)
//! - Cheap exclusively-owned snapshots (`Network` is `Clone`; every scenario
//!   evaluation works on its own copy, never on shared mutable state)
//! - Type-safe element access with newtype IDs
//! - Parallel branches between the same bus pair
//!
//! ## Quick Start
//!
//! ```rust
//! use gre_core::*;
//!
//! let mut network = Network::new();
//!
//! let b1 = network.add_bus(Bus {
//!     id: BusId::new(1),
//!     name: "Kahe".to_string(),
//!     v_nom: Kilovolts(138.0),
//!     ..Bus::default()
//! });
//! let b2 = network.add_bus(Bus {
//!     id: BusId::new(2),
//!     name: "Waiau".to_string(),
//!     v_nom: Kilovolts(138.0),
//!     ..Bus::default()
//! });
//!
//! network.add_gen(Gen::new(GenId::new(1), "Kahe 5".to_string(), BusId::new(1)).with_p_set(120.0));
//! network.add_load(Load {
//!     id: LoadId::new(1),
//!     name: "Waiau load".to_string(),
//!     bus: BusId::new(2),
//!     active_power: Megawatts(80.0),
//!     reactive_power: Megavars(15.0),
//! });
//!
//! network.add_line(
//!     b1,
//!     b2,
//!     Line::new(LineId::new(1), "L1".to_string(), BusId::new(1), BusId::new(2), 0.01, 0.1)
//!         .with_s_nom(150.0),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Warning/error collection for degraded analyses
//! - [`graph_utils`] - Topological analysis (energized components, islands)
//! - [`solver`] - Dense linear-system backends used by the DC flow solve
//! - [`units`] - Compile-time unit safety for physical quantities

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod solver;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use solver::{FaerSolver, GaussSolver, LinearSystemBackend};
pub use units::{
    Amperes, Celsius, Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit,
};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);

macro_rules! impl_id {
    ($type:ty) => {
        impl $type {
            #[inline]
            pub fn new(value: usize) -> Self {
                Self(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }
    };
}

impl_id!(BusId);
impl_id!(LineId);
impl_id!(GenId);
impl_id!(LoadId);

/// A substation bus. Coordinates are carried through to islanding reports so
/// the excluded map layer can place markers without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Nominal voltage in kilovolts
    pub v_nom: Kilovolts,
    /// Longitude or planar x coordinate
    pub x: f64,
    /// Latitude or planar y coordinate
    pub y: f64,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            v_nom: Kilovolts(0.0),
            x: 0.0,
            y: 0.0,
        }
    }
}

/// A transmission line between two buses.
///
/// `s_nom` is the static thermal rating used whenever a weather-dependent
/// rating cannot be computed. `conductor` references a `ConductorSpec` by
/// name in the conductor library; a dangling or absent reference is not an
/// error, it degrades the line to its static rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series resistance (per-unit)
    pub resistance: f64,
    /// Series reactance (per-unit)
    pub reactance: f64,
    /// Total line charging susceptance (per-unit)
    pub susceptance: PerUnit,
    /// Static thermal rating
    pub s_nom: MegavoltAmperes,
    /// Conductor library key, if known
    pub conductor: Option<String>,
    /// Maximum operating temperature override
    pub mot: Option<Celsius>,
    /// In-service flag; outaged lines stay in the graph with `active = false`
    pub active: bool,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            id: LineId(0),
            name: String::new(),
            from_bus: BusId(0),
            to_bus: BusId(0),
            resistance: 0.0,
            reactance: 0.0,
            susceptance: PerUnit(0.0),
            s_nom: MegavoltAmperes(0.0),
            conductor: None,
            mot: None,
            active: true,
        }
    }
}

impl Line {
    /// Construct a line from impedance fields, filling the rest with defaults.
    pub fn new(
        id: LineId,
        name: String,
        from_bus: BusId,
        to_bus: BusId,
        resistance: f64,
        reactance: f64,
    ) -> Self {
        Self {
            id,
            name,
            from_bus,
            to_bus,
            resistance,
            reactance,
            ..Self::default()
        }
    }

    /// Attach a static thermal rating in MVA.
    pub fn with_s_nom(mut self, s_nom_mva: f64) -> Self {
        self.s_nom = MegavoltAmperes(s_nom_mva);
        self
    }

    /// Attach a conductor library reference.
    pub fn with_conductor(mut self, conductor: impl Into<String>) -> Self {
        self.conductor = Some(conductor.into());
        self
    }

    /// Attach a maximum operating temperature in Celsius.
    pub fn with_mot(mut self, mot_c: f64) -> Self {
        self.mot = Some(Celsius(mot_c));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    /// Active power setpoint (MW)
    pub active_power: Megawatts,
    /// Reactive power setpoint (Mvar)
    pub reactive_power: Megavars,
    /// In-service status
    pub status: bool,
}

impl Gen {
    pub fn new(id: GenId, name: String, bus: BusId) -> Self {
        Self {
            id,
            name,
            bus,
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
            status: true,
        }
    }

    /// Set the active power setpoint (MW).
    pub fn with_p_set(mut self, p_mw: f64) -> Self {
        self.active_power = Megawatts(p_mw);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Active power demand (MW)
    pub active_power: Megawatts,
    /// Reactive power demand (Mvar)
    pub reactive_power: Megavars,
}

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
}

impl Node {
    /// Returns a human-readable label for the node.
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Gen(gen) => &gen.name,
            Node::Load(load) => &load.name,
        }
    }
}

/// The core transmission network graph.
///
/// Buses, generators, and loads are nodes; lines are edges between bus
/// nodes. Topology stays explicit for the connectivity checks that back
/// island detection and for the DC flow solve.
#[derive(Debug, Default, Clone)]
pub struct Network {
    pub graph: Graph<Node, Line, Undirected>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
        }
    }

    /// Add a bus node, returning its graph index for wiring lines.
    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    /// Add a generator node.
    pub fn add_gen(&mut self, gen: Gen) -> NodeIndex {
        self.graph.add_node(Node::Gen(gen))
    }

    /// Add a load node.
    pub fn add_load(&mut self, load: Load) -> NodeIndex {
        self.graph.add_node(Node::Load(load))
    }

    /// Add a line between two bus nodes.
    pub fn add_line(&mut self, from: NodeIndex, to: NodeIndex, line: Line) -> EdgeIndex {
        self.graph.add_edge(from, to, line)
    }

    /// Look up the graph index of a bus by its ID.
    pub fn bus_index(&self, bus_id: BusId) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&idx| {
            matches!(&self.graph[idx], Node::Bus(bus) if bus.id == bus_id)
        })
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Gen(g) => {
                    stats.num_gens += 1;
                    if g.status {
                        stats.total_gen_mw += g.active_power.value();
                    }
                }
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.total_load_mw += l.active_power.value();
                    stats.total_load_mvar += l.reactive_power.value();
                }
            }
        }

        stats.num_lines = self.graph.edge_count();
        stats.num_active_lines = self.graph.edge_weights().filter(|l| l.active).count();
        stats
    }

    /// Validate network data for issues that break downstream analyses.
    ///
    /// Populates the provided `Diagnostics` with any warnings/errors found.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no buses");
            return; // Can't check further
        }

        if stats.total_load_mw.abs() < 1e-9 {
            diag.add_warning("structure", "Network has no load");
        }

        if stats.num_gens == 0 {
            diag.add_error(
                "structure",
                "Network has no generators; every bus will report as islanded",
            );
        }

        if stats.num_lines == 0 && stats.num_buses > 1 {
            diag.add_error("structure", "Network has multiple buses but no lines");
        }

        for line in self.lines() {
            if line.s_nom.value() <= 0.0 {
                diag.add_warning_with_entity(
                    "rating",
                    "s_nom is not positive; loading will be reported as unknown",
                    &line.name,
                );
            }
            if self.bus_index(line.from_bus).is_none() || self.bus_index(line.to_bus).is_none() {
                diag.add_error_with_entity(
                    "reference",
                    "line references a bus that does not exist",
                    &line.name,
                );
            }
        }
    }

    /// Get total active power generation from in-service units (MW)
    pub fn total_generation_mw(&self) -> f64 {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) if g.status => Some(g.active_power.value()),
                _ => None,
            })
            .sum()
    }

    /// Get total active power load (MW)
    pub fn total_load_mw(&self) -> f64 {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l.active_power.value()),
                _ => None,
            })
            .sum()
    }

    /// Get all buses as a vector
    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Get all generators as a vector
    pub fn generators(&self) -> Vec<&Gen> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    /// Get all loads as a vector
    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    /// Get all lines as a vector, in edge order
    pub fn lines(&self) -> Vec<&Line> {
        self.graph.edge_weights().collect()
    }

    /// Sorted list of every line name, for validation messages.
    pub fn line_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .edge_weights()
            .map(|l| l.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Find a line by name.
    pub fn line_by_name(&self, name: &str) -> Option<&Line> {
        self.graph.edge_weights().find(|l| l.name == name)
    }

    /// Find the bus a line endpoint refers to.
    pub fn bus(&self, bus_id: BusId) -> Option<&Bus> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Bus(b) if b.id == bus_id => Some(b),
            _ => None,
        })
    }

    /// Mark a line out of service by name. Returns false if the name is unknown.
    pub fn deactivate_line(&mut self, name: &str) -> bool {
        for line in self.graph.edge_weights_mut() {
            if line.name == name {
                line.active = false;
                return true;
            }
        }
        false
    }

    /// Scale every load and every in-service generator setpoint by `factor`.
    ///
    /// Loads and generation scale together so the scenario stays balanced;
    /// scaling only one side manufactures slack-bus swings that read as
    /// spurious non-convergence.
    pub fn scale_injections(&mut self, factor: f64) {
        for node in self.graph.node_weights_mut() {
            match node {
                Node::Load(load) => {
                    load.active_power = load.active_power * factor;
                    load.reactive_power = load.reactive_power * factor;
                }
                Node::Gen(gen) if gen.status => {
                    gen.active_power = gen.active_power * factor;
                    gen.reactive_power = gen.reactive_power * factor;
                }
                _ => {}
            }
        }
    }
}

/// Statistics about a network's size and injections
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub num_lines: usize,
    pub num_active_lines: usize,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_gen_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} lines ({} active), {} gens ({:.0} MW), {} loads ({:.0} MW)",
            self.num_buses,
            self.num_lines,
            self.num_active_lines,
            self.num_gens,
            self.total_gen_mw,
            self.num_loads,
            self.total_load_mw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_network() -> Network {
        let mut network = Network::new();
        let b1 = network.add_bus(Bus {
            id: BusId::new(1),
            name: "Bus 1".to_string(),
            v_nom: Kilovolts(138.0),
            ..Bus::default()
        });
        let b2 = network.add_bus(Bus {
            id: BusId::new(2),
            name: "Bus 2".to_string(),
            v_nom: Kilovolts(138.0),
            ..Bus::default()
        });
        network.add_gen(Gen::new(GenId::new(1), "Gen 1".into(), BusId::new(1)).with_p_set(100.0));
        network.add_load(Load {
            id: LoadId::new(1),
            name: "Load 1".into(),
            bus: BusId::new(2),
            active_power: Megawatts(50.0),
            reactive_power: Megavars(10.0),
        });
        network.add_line(
            b1,
            b2,
            Line::new(
                LineId::new(1),
                "L1".to_string(),
                BusId::new(1),
                BusId::new(2),
                0.01,
                0.1,
            )
            .with_s_nom(120.0),
        );
        network
    }

    #[test]
    fn test_network_creation_and_stats() {
        let network = two_bus_network();
        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_gens, 1);
        assert_eq!(stats.num_loads, 1);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_active_lines, 1);
        assert!((stats.total_load_mw - 50.0).abs() < 0.01);
        assert!((stats.total_gen_mw - 100.0).abs() < 0.01);

        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_validation_empty_network() {
        let network = Network::new();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.has_errors());
        assert!(diag.errors().any(|i| i.message.contains("no buses")));
    }

    #[test]
    fn test_validation_nonpositive_s_nom() {
        let mut network = two_bus_network();
        for line in network.graph.edge_weights_mut() {
            line.s_nom = MegavoltAmperes(0.0);
        }
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.warnings().any(|i| i.message.contains("s_nom")));
    }

    #[test]
    fn test_deactivate_line() {
        let mut network = two_bus_network();
        assert!(network.deactivate_line("L1"));
        assert!(!network.line_by_name("L1").unwrap().active);
        assert_eq!(network.stats().num_active_lines, 0);
        assert!(!network.deactivate_line("no-such-line"));
    }

    #[test]
    fn test_scale_injections_scales_both_sides() {
        let mut network = two_bus_network();
        network.scale_injections(1.1);
        assert!((network.total_load_mw() - 55.0).abs() < 1e-9);
        assert!((network.total_generation_mw() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_clone_is_independent() {
        let network = two_bus_network();
        let mut snapshot = network.clone();
        snapshot.deactivate_line("L1");
        snapshot.scale_injections(2.0);
        // The source topology is untouched.
        assert!(network.line_by_name("L1").unwrap().active);
        assert!((network.total_load_mw() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_names_sorted() {
        let mut network = two_bus_network();
        let b3 = network.add_bus(Bus {
            id: BusId::new(3),
            name: "Bus 3".to_string(),
            v_nom: Kilovolts(138.0),
            ..Bus::default()
        });
        let b1 = network.bus_index(BusId::new(1)).unwrap();
        network.add_line(
            b1,
            b3,
            Line::new(
                LineId::new(2),
                "A9".to_string(),
                BusId::new(1),
                BusId::new(3),
                0.01,
                0.1,
            ),
        );
        assert_eq!(network.line_names(), vec!["A9".to_string(), "L1".to_string()]);
    }
}
