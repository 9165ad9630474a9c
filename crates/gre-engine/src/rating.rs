//! Weather-dependent line ratings.
//!
//! For each line: resolve its conductor from the reference arena, run the
//! steady-state thermal model at the line's maximum operating temperature,
//! convert amps to MVA at the line's nominal voltage, and classify the
//! supplied flow against the result. A line whose thermal rating cannot be
//! resolved (missing or unknown conductor, missing bus voltage) degrades to
//! its static `s_nom`; the result set always covers every requested line.
//!
//! Per-line work is independent (no cross-line state), so the loop runs on
//! rayon.

use crate::arena::ConductorLibrary;
use crate::classify::{loading_percent, StressLevel};
use gre_core::diagnostics::{DiagnosticIssue, Severity};
use gre_core::{
    BusId, Celsius, Diagnostics, GridError, GridResult, Line, MegavoltAmperes, Megawatts, Network,
};
use gre_thermal::{steady_state_rating, WeatherState};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Plausible MOT range; values outside are treated as data errors and clamped.
pub const MOT_CLAMP_MIN_C: f64 = 50.0;
pub const MOT_CLAMP_MAX_C: f64 = 100.0;

/// Assumed power factor for MW -> MVA conversion where the solver only
/// reports real power. An approximation, configurable per engine.
pub const DEFAULT_POWER_FACTOR: f64 = 0.95;

/// Where a line's rating came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSource {
    /// IEEE-738 thermal model at the line's MOT
    Thermal,
    /// Static `s_nom`, because thermal resolution failed
    StaticFallback,
}

/// Rating and classification for one line at one weather state.
#[derive(Debug, Clone, Serialize)]
pub struct RatingResult {
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conductor: Option<String>,
    /// MOT actually used, after substitution and clamping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mot_c: Option<f64>,
    pub voltage_kv: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_amps: Option<f64>,
    pub rating_mva: f64,
    pub static_rating_mva: f64,
    pub flow_mva: f64,
    pub loading_pct: Option<f64>,
    pub margin_mva: f64,
    pub stress: StressLevel,
    pub source: RatingSource,
}

/// One entry in the most-loaded list.
#[derive(Debug, Clone, Serialize)]
pub struct MostLoadedLine {
    pub name: String,
    pub loading_pct: f64,
    pub margin_mva: f64,
}

/// Aggregate view over a full rating pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RatingSummary {
    pub total_lines: usize,
    pub normal_count: usize,
    pub caution_count: usize,
    pub high_stress_count: usize,
    pub overloaded_count: usize,
    pub unknown_count: usize,
    pub static_fallback_count: usize,
    pub avg_loading_pct: Option<f64>,
    pub max_loading_pct: Option<f64>,
    /// Top lines by loading, descending
    pub most_loaded: Vec<MostLoadedLine>,
}

/// Full output of a rating pass: every line, the summary, and the
/// degradation diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RatedLines {
    pub lines: Vec<RatingResult>,
    pub summary: RatingSummary,
    pub diagnostics: Diagnostics,
}

/// One point of an ambient-temperature sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub temperature_c: f64,
    pub overloaded_count: usize,
    pub high_stress_count: usize,
    pub avg_loading_pct: Option<f64>,
    pub max_loading_pct: Option<f64>,
}

/// Result of [`RatingEngine::overload_threshold_sweep`].
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSweep {
    pub temp_start_c: f64,
    pub temp_end_c: f64,
    pub wind_ft_s: f64,
    /// First swept temperature at which any line overloads
    pub first_overload_temp_c: Option<f64>,
    pub progression: Vec<SweepPoint>,
}

/// Computes per-line ratings against a shared conductor arena.
pub struct RatingEngine {
    conductors: Arc<ConductorLibrary>,
    power_factor: f64,
}

impl RatingEngine {
    pub fn new(conductors: Arc<ConductorLibrary>) -> Self {
        Self {
            conductors,
            power_factor: DEFAULT_POWER_FACTOR,
        }
    }

    /// Override the assumed power factor for MW -> MVA conversion.
    pub fn with_power_factor(mut self, power_factor: f64) -> Self {
        self.power_factor = power_factor;
        self
    }

    pub fn power_factor(&self) -> f64 {
        self.power_factor
    }

    /// Rate every line of the network against `flows_mva` (apparent power
    /// per line name). Weather is validated up front; malformed ranges are
    /// an input error, not a degradation.
    pub fn rate_all_lines(
        &self,
        network: &Network,
        weather: &WeatherState,
        flows_mva: &HashMap<String, f64>,
    ) -> GridResult<RatedLines> {
        weather.validate()?;

        let lines = network.lines();
        let rated: Vec<(RatingResult, Vec<DiagnosticIssue>)> = lines
            .par_iter()
            .map(|line| self.rate_line(network, line, weather, flows_mva))
            .collect();

        let mut diagnostics = Diagnostics::new();
        let mut results = Vec::with_capacity(rated.len());
        for (result, issues) in rated {
            for issue in issues {
                diagnostics.add(issue);
            }
            results.push(result);
        }

        let summary = summarize(&results);
        Ok(RatedLines {
            lines: results,
            summary,
            diagnostics,
        })
    }

    /// Rate against solver output (real power, MW), converting to apparent
    /// power with the engine's power factor first.
    pub fn rate_with_solved_flows(
        &self,
        network: &Network,
        weather: &WeatherState,
        flows_mw: &HashMap<String, f64>,
    ) -> GridResult<RatedLines> {
        let flows_mva: HashMap<String, f64> = flows_mw
            .iter()
            .map(|(name, &mw)| {
                (
                    name.clone(),
                    Megawatts(mw.abs()).to_apparent(self.power_factor).value(),
                )
            })
            .collect();
        self.rate_all_lines(network, weather, &flows_mva)
    }

    /// Sweep ambient temperature and report where overloads begin.
    pub fn overload_threshold_sweep(
        &self,
        network: &Network,
        flows_mva: &HashMap<String, f64>,
        temp_start_c: f64,
        temp_end_c: f64,
        step_c: f64,
        wind_ft_s: f64,
    ) -> GridResult<ThresholdSweep> {
        if !(step_c > 0.0) {
            return Err(GridError::Validation(
                "sweep step must be positive".to_string(),
            ));
        }
        if temp_end_c < temp_start_c {
            return Err(GridError::Validation(
                "sweep end temperature must not be below the start".to_string(),
            ));
        }

        let mut progression = Vec::new();
        let mut first_overload_temp_c = None;
        let mut temperature = temp_start_c;
        while temperature <= temp_end_c + 1e-9 {
            let weather = WeatherState::new()
                .with_ambient(temperature)
                .with_wind_speed(wind_ft_s);
            let rated = self.rate_all_lines(network, &weather, flows_mva)?;
            if first_overload_temp_c.is_none() && rated.summary.overloaded_count > 0 {
                first_overload_temp_c = Some(temperature);
            }
            progression.push(SweepPoint {
                temperature_c: temperature,
                overloaded_count: rated.summary.overloaded_count,
                high_stress_count: rated.summary.high_stress_count,
                avg_loading_pct: rated.summary.avg_loading_pct,
                max_loading_pct: rated.summary.max_loading_pct,
            });
            temperature += step_c;
        }

        Ok(ThresholdSweep {
            temp_start_c,
            temp_end_c,
            wind_ft_s,
            first_overload_temp_c,
            progression,
        })
    }

    fn rate_line(
        &self,
        network: &Network,
        line: &Line,
        weather: &WeatherState,
        flows_mva: &HashMap<String, f64>,
    ) -> (RatingResult, Vec<DiagnosticIssue>) {
        let mut issues = Vec::new();
        let flow_mva = flows_mva.get(&line.name).copied().unwrap_or(0.0).abs();
        let static_rating_mva = line.s_nom.value();
        let voltage = network.bus(line.from_bus).map(|bus| bus.v_nom);

        let thermal = self.thermal_rating(line, weather, &mut issues);

        let (rating_amps, rating_mva, mot_c, source) = match (thermal, voltage) {
            (Some((amps, mot)), Some(kv)) => (
                Some(amps.value()),
                MegavoltAmperes::from_current(amps, kv).value(),
                Some(mot.value()),
                RatingSource::Thermal,
            ),
            (Some(_), None) => {
                warn!(line = %line.name, "from-bus voltage unresolved; using static rating");
                issues.push(
                    DiagnosticIssue::new(
                        Severity::Warning,
                        "reference",
                        "from-bus voltage unresolved; using static rating",
                    )
                    .with_entity(line.name.clone()),
                );
                (None, static_rating_mva, None, RatingSource::StaticFallback)
            }
            (None, _) => (None, static_rating_mva, None, RatingSource::StaticFallback),
        };

        let loading_pct = loading_percent(flow_mva, rating_mva);
        let result = RatingResult {
            name: line.name.clone(),
            from_bus: line.from_bus,
            to_bus: line.to_bus,
            conductor: line.conductor.clone(),
            mot_c,
            voltage_kv: voltage.map(|kv| kv.value()).unwrap_or(0.0),
            rating_amps,
            rating_mva,
            static_rating_mva,
            flow_mva,
            loading_pct,
            margin_mva: rating_mva - flow_mva,
            stress: StressLevel::from_loading(loading_pct),
            source,
        };
        (result, issues)
    }

    /// Resolve conductor and MOT, then run the thermal model. `None` means
    /// the caller must fall back to the static rating.
    fn thermal_rating(
        &self,
        line: &Line,
        weather: &WeatherState,
        issues: &mut Vec<DiagnosticIssue>,
    ) -> Option<(gre_core::Amperes, Celsius)> {
        let Some(conductor_name) = line.conductor.as_deref() else {
            warn!(line = %line.name, "no conductor reference; using static rating");
            issues.push(
                DiagnosticIssue::new(
                    Severity::Warning,
                    "rating",
                    "no conductor reference; using static rating",
                )
                .with_entity(line.name.clone()),
            );
            return None;
        };

        let Some(spec) = self.conductors.get(conductor_name) else {
            warn!(
                line = %line.name,
                conductor = conductor_name,
                "conductor not found in library; using static rating"
            );
            issues.push(
                DiagnosticIssue::new(
                    Severity::Warning,
                    "reference",
                    format!("conductor '{conductor_name}' not found in library; using static rating"),
                )
                .with_entity(line.name.clone()),
            );
            return None;
        };

        let raw_mot = match line.mot.or(spec.max_operating_temp) {
            Some(mot) => mot,
            None => {
                warn!(
                    line = %line.name,
                    substitute = weather.ambient.value(),
                    "MOT missing; substituting ambient before clamping"
                );
                issues.push(
                    DiagnosticIssue::new(
                        Severity::Warning,
                        "rating",
                        "MOT missing; substituting ambient before clamping",
                    )
                    .with_entity(line.name.clone()),
                );
                weather.ambient
            }
        };

        let mot = raw_mot.clamp(Celsius(MOT_CLAMP_MIN_C), Celsius(MOT_CLAMP_MAX_C));
        if (mot.value() - raw_mot.value()).abs() > f64::EPSILON {
            warn!(
                line = %line.name,
                raw = raw_mot.value(),
                clamped = mot.value(),
                "MOT outside plausible range; clamped"
            );
            issues.push(
                DiagnosticIssue::new(
                    Severity::Warning,
                    "rating",
                    format!(
                        "MOT {:.1} outside {:.0}-{:.0} range; clamped to {:.1}",
                        raw_mot.value(),
                        MOT_CLAMP_MIN_C,
                        MOT_CLAMP_MAX_C,
                        mot.value()
                    ),
                )
                .with_entity(line.name.clone()),
            );
        }

        Some((steady_state_rating(spec, weather, mot), mot))
    }
}

fn summarize(results: &[RatingResult]) -> RatingSummary {
    let mut summary = RatingSummary {
        total_lines: results.len(),
        ..RatingSummary::default()
    };

    let mut loadings: Vec<(f64, &RatingResult)> = Vec::new();
    for result in results {
        match result.stress {
            StressLevel::Normal => summary.normal_count += 1,
            StressLevel::Caution => summary.caution_count += 1,
            StressLevel::HighStress => summary.high_stress_count += 1,
            StressLevel::Overloaded => summary.overloaded_count += 1,
            StressLevel::Unknown => summary.unknown_count += 1,
            StressLevel::Outaged => {}
        }
        if result.source == RatingSource::StaticFallback {
            summary.static_fallback_count += 1;
        }
        if let Some(loading) = result.loading_pct {
            loadings.push((loading, result));
        }
    }

    if !loadings.is_empty() {
        let sum: f64 = loadings.iter().map(|(l, _)| l).sum();
        summary.avg_loading_pct = Some(sum / loadings.len() as f64);
        summary.max_loading_pct = loadings
            .iter()
            .map(|(l, _)| *l)
            .fold(None, |acc: Option<f64>, l| {
                Some(acc.map_or(l, |a| a.max(l)))
            });
        loadings.sort_by(|a, b| b.0.total_cmp(&a.0));
        summary.most_loaded = loadings
            .iter()
            .take(10)
            .map(|(loading, result)| MostLoadedLine {
                name: result.name.clone(),
                loading_pct: *loading,
                margin_mva: result.margin_mva,
            })
            .collect();
    }

    summary
}
