//! Topological analysis over the active-line subgraph.
//!
//! Islanding here is defined by generator reachability, not mere
//! connectivity: a bus is islanded when no path of in-service lines reaches
//! any bus hosting an in-service generator. The check is purely topological
//! and ignores real/reactive power balance.

use crate::{BusId, Network, Node};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// An islanded bus, with enough context for reporting and map placement.
#[derive(Debug, Clone, Serialize)]
pub struct IslandedBus {
    pub bus_id: BusId,
    pub bus_name: String,
    pub voltage_kv: f64,
    pub x: f64,
    pub y: f64,
}

/// Buses reachable from at least one in-service generator via active lines.
///
/// A network with zero in-service generators returns the empty set, which
/// makes every bus islanded by definition.
pub fn energized_buses(network: &Network) -> HashSet<BusId> {
    let bus_nodes = bus_node_indices(network);

    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    for node in network.graph.node_weights() {
        if let Node::Gen(gen) = node {
            if gen.status {
                if let Some(&idx) = bus_nodes.get(&gen.bus) {
                    if visited.insert(idx) {
                        queue.push_back(idx);
                    }
                }
            }
        }
    }

    let mut energized = HashSet::new();
    while let Some(idx) = queue.pop_front() {
        if let Node::Bus(bus) = &network.graph[idx] {
            energized.insert(bus.id);
        }
        for edge in network.graph.edges(idx) {
            if !edge.weight().active {
                continue;
            }
            let neighbor = if edge.source() == idx {
                edge.target()
            } else {
                edge.source()
            };
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    energized
}

/// Buses with no active-line path to any generator, sorted by bus ID.
pub fn islanded_buses(network: &Network) -> Vec<IslandedBus> {
    let energized = energized_buses(network);
    let mut islanded: Vec<IslandedBus> = network
        .buses()
        .into_iter()
        .filter(|bus| !energized.contains(&bus.id))
        .map(|bus| IslandedBus {
            bus_id: bus.id,
            bus_name: bus.name.clone(),
            voltage_kv: bus.v_nom.value(),
            x: bus.x,
            y: bus.y,
        })
        .collect();
    islanded.sort_by_key(|b| b.bus_id);
    islanded
}

/// Connected components of the active-line subgraph, as bus-ID groups sorted
/// by their smallest member. Single-bus components are included.
///
/// The DC solve runs once per component with a per-component reference bus,
/// so an islanded snapshot stays solvable instead of going singular.
pub fn active_components(network: &Network) -> Vec<Vec<BusId>> {
    let bus_nodes = bus_node_indices(network);

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut components = Vec::new();
    for &start in bus_nodes.values() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        let mut members = Vec::new();
        while let Some(idx) = queue.pop_front() {
            if let Node::Bus(bus) = &network.graph[idx] {
                members.push(bus.id);
            }
            for edge in network.graph.edges(idx) {
                if !edge.weight().active {
                    continue;
                }
                let neighbor = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();
        components.push(members);
    }
    components.sort_by_key(|members| members.first().copied());
    components
}

fn bus_node_indices(network: &Network) -> HashMap<BusId, NodeIndex> {
    network
        .graph
        .node_indices()
        .filter_map(|idx| match &network.graph[idx] {
            Node::Bus(bus) => Some((bus.id, idx)),
            _ => None,
        })
        .collect()
}
