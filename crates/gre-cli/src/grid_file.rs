//! Grid description files.
//!
//! A plain serde_json document of bus/line/generator/load records plus an
//! optional embedded conductor library. This is a scenario-construction
//! convenience for the CLI, not a data-import layer: referential integrity
//! is checked while wiring the graph, and anything the engines can degrade
//! around (missing conductors, missing MOT) is left to them.

use anyhow::{anyhow, Context, Result};
use gre_core::{Bus, BusId, Gen, GenId, Kilovolts, Line, LineId, Load, LoadId, Megavars,
    Megawatts, Network, NodeIndex, PerUnit};
use gre_engine::ConductorLibrary;
use gre_thermal::ConductorSpec;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct GridFile {
    pub buses: Vec<BusRecord>,
    pub lines: Vec<LineRecord>,
    #[serde(default)]
    pub generators: Vec<GenRecord>,
    #[serde(default)]
    pub loads: Vec<LoadRecord>,
    #[serde(default)]
    pub conductors: Vec<ConductorRecord>,
}

#[derive(Debug, Deserialize)]
pub struct BusRecord {
    pub id: usize,
    pub name: String,
    pub v_nom_kv: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Deserialize)]
pub struct LineRecord {
    pub id: usize,
    pub name: String,
    pub bus0: usize,
    pub bus1: usize,
    #[serde(default)]
    pub resistance: f64,
    pub reactance: f64,
    #[serde(default)]
    pub susceptance: f64,
    pub s_nom_mva: f64,
    #[serde(default)]
    pub conductor: Option<String>,
    #[serde(default)]
    pub mot_c: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct GenRecord {
    pub id: usize,
    pub name: String,
    pub bus: usize,
    pub p_set_mw: f64,
}

#[derive(Debug, Deserialize)]
pub struct LoadRecord {
    pub id: usize,
    pub name: String,
    pub bus: usize,
    pub p_set_mw: f64,
    #[serde(default)]
    pub q_set_mvar: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConductorRecord {
    pub name: String,
    pub res_25c_ohm_per_mile: f64,
    pub res_50c_ohm_per_mile: f64,
    pub radius_in: f64,
    #[serde(default)]
    pub mot_c: Option<f64>,
}

/// Read and wire a grid file into a network and its conductor arena.
pub fn load_grid(path: &Path) -> Result<(Network, ConductorLibrary)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading grid file {}", path.display()))?;
    let file: GridFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing grid file {}", path.display()))?;
    build_grid(file)
}

pub fn build_grid(file: GridFile) -> Result<(Network, ConductorLibrary)> {
    let mut network = Network::new();
    let mut bus_nodes: HashMap<usize, NodeIndex> = HashMap::new();

    for record in &file.buses {
        let idx = network.add_bus(Bus {
            id: BusId::new(record.id),
            name: record.name.clone(),
            v_nom: Kilovolts(record.v_nom_kv),
            x: record.x,
            y: record.y,
        });
        if bus_nodes.insert(record.id, idx).is_some() {
            return Err(anyhow!("duplicate bus id {}", record.id));
        }
    }

    for record in &file.generators {
        if !bus_nodes.contains_key(&record.bus) {
            return Err(anyhow!(
                "generator '{}' references unknown bus {}",
                record.name,
                record.bus
            ));
        }
        network.add_gen(
            Gen::new(GenId::new(record.id), record.name.clone(), BusId::new(record.bus))
                .with_p_set(record.p_set_mw),
        );
    }

    for record in &file.loads {
        if !bus_nodes.contains_key(&record.bus) {
            return Err(anyhow!(
                "load '{}' references unknown bus {}",
                record.name,
                record.bus
            ));
        }
        network.add_load(Load {
            id: LoadId::new(record.id),
            name: record.name.clone(),
            bus: BusId::new(record.bus),
            active_power: Megawatts(record.p_set_mw),
            reactive_power: Megavars(record.q_set_mvar),
        });
    }

    for record in &file.lines {
        let (Some(&from), Some(&to)) =
            (bus_nodes.get(&record.bus0), bus_nodes.get(&record.bus1))
        else {
            return Err(anyhow!(
                "line '{}' references unknown bus {} or {}",
                record.name,
                record.bus0,
                record.bus1
            ));
        };
        let mut line = Line::new(
            LineId::new(record.id),
            record.name.clone(),
            BusId::new(record.bus0),
            BusId::new(record.bus1),
            record.resistance,
            record.reactance,
        )
        .with_s_nom(record.s_nom_mva);
        line.susceptance = PerUnit(record.susceptance);
        if let Some(conductor) = &record.conductor {
            line = line.with_conductor(conductor.clone());
        }
        if let Some(mot) = record.mot_c {
            line = line.with_mot(mot);
        }
        network.add_line(from, to, line);
    }

    let conductors = ConductorLibrary::from_specs(file.conductors.iter().map(|record| {
        ConductorSpec::from_library_row(
            record.name.clone(),
            record.res_25c_ohm_per_mile,
            record.res_50c_ohm_per_mile,
            record.radius_in,
            record.mot_c,
        )
    }));

    Ok((network, conductors))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "buses": [
            {"id": 1, "name": "Kahe", "v_nom_kv": 138.0},
            {"id": 2, "name": "Waiau", "v_nom_kv": 138.0, "x": -158.0, "y": 21.35}
        ],
        "generators": [{"id": 1, "name": "Kahe 5", "bus": 1, "p_set_mw": 90.0}],
        "loads": [{"id": 1, "name": "Waiau load", "bus": 2, "p_set_mw": 90.0}],
        "lines": [
            {"id": 1, "name": "L1", "bus0": 1, "bus1": 2, "reactance": 0.1,
             "s_nom_mva": 120.0, "conductor": "DRAKE", "mot_c": 75.0}
        ],
        "conductors": [
            {"name": "DRAKE", "res_25c_ohm_per_mile": 0.1166,
             "res_50c_ohm_per_mile": 0.1278, "radius_in": 0.554}
        ]
    }"#;

    #[test]
    fn test_build_sample_grid() {
        let file: GridFile = serde_json::from_str(SAMPLE).unwrap();
        let (network, conductors) = build_grid(file).unwrap();
        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_lines, 1);
        assert_eq!(stats.num_gens, 1);
        assert_eq!(stats.num_loads, 1);
        assert!(conductors.get("DRAKE").is_some());

        let line = network.line_by_name("L1").unwrap();
        assert_eq!(line.conductor.as_deref(), Some("DRAKE"));
        assert!((line.s_nom.value() - 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_bus_reference_rejected() {
        let text = r#"{
            "buses": [{"id": 1, "name": "A", "v_nom_kv": 69.0}],
            "lines": [{"id": 1, "name": "L1", "bus0": 1, "bus1": 9,
                       "reactance": 0.1, "s_nom_mva": 50.0}]
        }"#;
        let file: GridFile = serde_json::from_str(text).unwrap();
        let err = build_grid(file).unwrap_err();
        assert!(err.to_string().contains("unknown bus"));
    }

    #[test]
    fn test_duplicate_bus_rejected() {
        let text = r#"{
            "buses": [
                {"id": 1, "name": "A", "v_nom_kv": 69.0},
                {"id": 1, "name": "B", "v_nom_kv": 69.0}
            ],
            "lines": []
        }"#;
        let file: GridFile = serde_json::from_str(text).unwrap();
        assert!(build_grid(file).unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_grid_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        fs::write(&path, SAMPLE).unwrap();
        let (network, _) = load_grid(&path).unwrap();
        assert_eq!(network.stats().num_buses, 2);
    }
}
