//! Daily load-scaling stress analysis.
//!
//! Replays a synthetic 24-hour demand curve through the network: a sine
//! profile with its minimum (0.9x nominal) at hour 6 and maximum (1.1x) at
//! hour 18. Loads and generation scale together each hour to preserve
//! power balance, the snapshot is re-solved, and every line is classified
//! with the shared stress buckets. Hours that fail to converge are still
//! reported, flagged, and excluded from the peak-hour aggregates.

use crate::classify::{loading_percent, StressLevel};
use crate::solver::{solve_with_fallback, FlowSolver, SolveInfo};
use gre_core::{GridError, GridResult, Megawatts, Network};
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Hours in the standard daily profile.
pub const DEFAULT_HOURS: usize = 24;
/// Nominal offset of the sine profile.
pub const PROFILE_OFFSET: f64 = 1.0;
/// Amplitude of the sine profile (+-10% of nominal).
pub const PROFILE_AMPLITUDE: f64 = 0.1;
/// Phase shift placing the minimum at hour 6 and the maximum at hour 18.
pub const PROFILE_PHASE: f64 = PI;
/// How many lines the most-stressed list keeps.
pub const MOST_STRESSED_TOP_N: usize = 5;

/// Hourly scale factors for a day of `hours` steps.
pub fn daily_profile(hours: usize) -> Vec<f64> {
    (0..hours)
        .map(|hour| {
            PROFILE_AMPLITUDE * (2.0 * PI * hour as f64 / hours as f64 + PROFILE_PHASE).sin()
                + PROFILE_OFFSET
        })
        .collect()
}

/// One line's loading at one hour.
#[derive(Debug, Clone, Serialize)]
pub struct HourLineLoading {
    pub name: String,
    pub flow_mw: f64,
    pub flow_mva: f64,
    pub loading_pct: Option<f64>,
    pub stress: StressLevel,
}

/// Full network state for one hour of the profile.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyResult {
    pub hour: usize,
    pub scale_factor: f64,
    pub converged: bool,
    pub solve: SolveInfo,
    pub total_load_mw: f64,
    pub total_gen_mw: f64,
    pub max_loading_pct: Option<f64>,
    pub avg_loading_pct: Option<f64>,
    pub overloaded_count: usize,
    pub high_stress_count: usize,
    pub caution_count: usize,
    pub lines: Vec<HourLineLoading>,
}

/// The hour at which some maximum occurred.
#[derive(Debug, Clone, Serialize)]
pub struct PeakHour {
    pub hour: usize,
    pub scale_factor: f64,
    pub max_loading_pct: Option<f64>,
    pub overloaded_count: usize,
}

/// A line's worst hour across the day.
#[derive(Debug, Clone, Serialize)]
pub struct StressedLine {
    pub name: String,
    pub max_loading_pct: f64,
    pub hour_of_max: usize,
    pub scale_at_max: f64,
}

/// One point of the generated profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePoint {
    pub hour: usize,
    pub scale_factor: f64,
}

/// Profile point with the scaled system totals, without solving.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileTotals {
    pub hour: usize,
    pub scale_factor: f64,
    pub load_mw: f64,
    pub gen_mw: f64,
}

/// Day-level aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub total_hours: usize,
    pub hours_converged: usize,
    pub hours_failed: usize,
    /// Hour with the single highest line loading, among converged hours
    pub peak_loading: Option<PeakHour>,
    /// Hour with the most overloaded lines, among converged hours
    pub peak_overloads: Option<PeakHour>,
    /// Per-line worst hours, top entries by that maximum
    pub most_stressed_lines: Vec<StressedLine>,
    pub load_profile: Vec<ProfilePoint>,
}

/// Output of [`LoadScalingEngine::analyze_daily_profile`].
#[derive(Debug, Clone, Serialize)]
pub struct DailyAnalysis {
    pub summary: DailySummary,
    pub hourly_results: Vec<HourlyResult>,
}

/// Replays scaled demand through the flow solver, one fresh snapshot per
/// hour.
pub struct LoadScalingEngine {
    baseline: Network,
    solver: Arc<dyn FlowSolver>,
    power_factor: f64,
}

impl LoadScalingEngine {
    pub fn new(baseline: Network, solver: Arc<dyn FlowSolver>) -> Self {
        Self {
            baseline,
            solver,
            power_factor: crate::rating::DEFAULT_POWER_FACTOR,
        }
    }

    /// Override the assumed power factor for MW -> MVA conversion.
    pub fn with_power_factor(mut self, power_factor: f64) -> Self {
        self.power_factor = power_factor;
        self
    }

    /// Analyze a full day of scaled demand.
    pub fn analyze_daily_profile(&self, hours: usize) -> GridResult<DailyAnalysis> {
        if hours == 0 || hours > 8760 {
            return Err(GridError::Validation(format!(
                "profile length must be 1-8760 hours, got {hours}"
            )));
        }

        let profile = daily_profile(hours);
        let mut hourly_results = Vec::with_capacity(hours);
        for (hour, &scale) in profile.iter().enumerate() {
            debug!(hour, scale, "analyzing profile hour");
            hourly_results.push(self.analyze_hour(hour, scale));
        }

        let summary = self.summarize(&profile, &hourly_results);
        Ok(DailyAnalysis {
            summary,
            hourly_results,
        })
    }

    /// Analyze a single hour of the standard 24-hour profile.
    pub fn analyze_single_hour(&self, hour: usize) -> GridResult<HourlyResult> {
        if hour >= DEFAULT_HOURS {
            return Err(GridError::Validation(format!(
                "hour must be 0-{}, got {hour}",
                DEFAULT_HOURS - 1
            )));
        }
        let profile = daily_profile(DEFAULT_HOURS);
        Ok(self.analyze_hour(hour, profile[hour]))
    }

    /// The generated profile with scaled system totals, without solving.
    pub fn load_profile(&self, hours: usize) -> Vec<ProfileTotals> {
        let base_load = self.baseline.total_load_mw();
        let base_gen = self.baseline.total_generation_mw();
        daily_profile(hours)
            .into_iter()
            .enumerate()
            .map(|(hour, scale)| ProfileTotals {
                hour,
                scale_factor: scale,
                load_mw: base_load * scale,
                gen_mw: base_gen * scale,
            })
            .collect()
    }

    fn analyze_hour(&self, hour: usize, scale: f64) -> HourlyResult {
        // Fresh snapshot per hour; loads and generation scale together.
        let mut snapshot = self.baseline.clone();
        snapshot.scale_injections(scale);

        let (solution, solve) = solve_with_fallback(self.solver.as_ref(), &snapshot, false);
        let converged = solve.converged;

        // A solve with no flows at all has nothing best-effort to report.
        let lines: Vec<HourLineLoading> = if solution.flows_mw.is_empty() && !converged {
            Vec::new()
        } else {
            snapshot
                .lines()
                .into_iter()
                .map(|line| {
                    let flow_mw = if line.active {
                        solution.flows_mw.get(&line.name).copied().unwrap_or(0.0).abs()
                    } else {
                        0.0
                    };
                    let flow_mva = Megawatts(flow_mw).to_apparent(self.power_factor).value();
                    let loading_pct = loading_percent(flow_mva, line.s_nom.value());
                    HourLineLoading {
                        name: line.name.clone(),
                        flow_mw,
                        flow_mva,
                        loading_pct,
                        stress: StressLevel::from_loading(loading_pct),
                    }
                })
                .collect()
        };

        let loadings: Vec<f64> = lines.iter().filter_map(|l| l.loading_pct).collect();
        HourlyResult {
            hour,
            scale_factor: scale,
            converged,
            total_load_mw: snapshot.total_load_mw(),
            total_gen_mw: snapshot.total_generation_mw(),
            max_loading_pct: loadings.iter().copied().reduce(f64::max),
            avg_loading_pct: if loadings.is_empty() {
                None
            } else {
                Some(loadings.iter().sum::<f64>() / loadings.len() as f64)
            },
            overloaded_count: count_stress(&lines, StressLevel::Overloaded),
            high_stress_count: count_stress(&lines, StressLevel::HighStress),
            caution_count: count_stress(&lines, StressLevel::Caution),
            lines,
            solve,
        }
    }

    fn summarize(&self, profile: &[f64], hourly: &[HourlyResult]) -> DailySummary {
        let converged: Vec<&HourlyResult> = hourly.iter().filter(|h| h.converged).collect();

        let peak_loading = converged
            .iter()
            .max_by(|a, b| {
                a.max_loading_pct
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&b.max_loading_pct.unwrap_or(f64::NEG_INFINITY))
            })
            .map(|h| peak_of(h));
        let peak_overloads = converged
            .iter()
            .max_by_key(|h| h.overloaded_count)
            .map(|h| peak_of(h));

        // Track each line's worst hour across the converged hours.
        let mut worst: HashMap<&str, StressedLine> = HashMap::new();
        for hour_result in &converged {
            for line in &hour_result.lines {
                let Some(loading) = line.loading_pct else {
                    continue;
                };
                let entry = worst.entry(line.name.as_str());
                let candidate = StressedLine {
                    name: line.name.clone(),
                    max_loading_pct: loading,
                    hour_of_max: hour_result.hour,
                    scale_at_max: hour_result.scale_factor,
                };
                entry
                    .and_modify(|existing| {
                        if loading > existing.max_loading_pct {
                            *existing = candidate.clone();
                        }
                    })
                    .or_insert(candidate);
            }
        }
        let mut most_stressed_lines: Vec<StressedLine> = worst.into_values().collect();
        most_stressed_lines.sort_by(|a, b| b.max_loading_pct.total_cmp(&a.max_loading_pct));
        most_stressed_lines.truncate(MOST_STRESSED_TOP_N);

        DailySummary {
            total_hours: hourly.len(),
            hours_converged: converged.len(),
            hours_failed: hourly.len() - converged.len(),
            peak_loading,
            peak_overloads,
            most_stressed_lines,
            load_profile: profile
                .iter()
                .enumerate()
                .map(|(hour, &scale)| ProfilePoint {
                    hour,
                    scale_factor: scale,
                })
                .collect(),
        }
    }
}

fn peak_of(hour: &HourlyResult) -> PeakHour {
    PeakHour {
        hour: hour.hour,
        scale_factor: hour.scale_factor,
        max_loading_pct: hour.max_loading_pct,
        overloaded_count: hour.overloaded_count,
    }
}

fn count_stress(lines: &[HourLineLoading], level: StressLevel) -> usize {
    lines.iter().filter(|l| l.stress == level).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::DcFlowSolver;
    use crate::test_support::{networks, ScriptedSolver};

    fn dc_engine(network: Network) -> LoadScalingEngine {
        LoadScalingEngine::new(network, Arc::new(DcFlowSolver::new()))
    }

    #[test]
    fn test_profile_endpoints_and_mean() {
        let profile = daily_profile(24);
        assert_eq!(profile.len(), 24);
        assert!((profile[6] - 0.9).abs() < 1e-9);
        assert!((profile[18] - 1.1).abs() < 1e-9);
        let mean: f64 = profile.iter().sum::<f64>() / 24.0;
        assert!((mean - 1.0).abs() < 1e-9);
        // Profile stays within the +-10% band.
        assert!(profile.iter().all(|s| (0.9..=1.1).contains(s)));
    }

    #[test]
    fn test_daily_analysis_finds_evening_peak() {
        let engine = dc_engine(networks::radial_chain(80.0));
        let analysis = engine.analyze_daily_profile(24).unwrap();

        assert_eq!(analysis.hourly_results.len(), 24);
        assert_eq!(analysis.summary.hours_converged, 24);
        assert_eq!(analysis.summary.hours_failed, 0);

        let peak = analysis.summary.peak_loading.as_ref().unwrap();
        assert_eq!(peak.hour, 18);
        // 88 MW at the peak -> 92.6 MVA against 100 MVA
        assert!((peak.max_loading_pct.unwrap() - 92.63).abs() < 0.01);

        let hour6 = &analysis.hourly_results[6];
        assert!((hour6.total_load_mw - 72.0).abs() < 1e-9);
        // Generation scaled with load to preserve balance.
        assert!((hour6.total_gen_mw - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_most_stressed_lines_tracked_per_line() {
        let engine = dc_engine(networks::radial_chain(80.0));
        let analysis = engine.analyze_daily_profile(24).unwrap();
        let top = &analysis.summary.most_stressed_lines;
        assert!(!top.is_empty() && top.len() <= MOST_STRESSED_TOP_N);
        for line in top {
            assert_eq!(line.hour_of_max, 18);
            assert!((line.scale_at_max - 1.1).abs() < 1e-9);
        }
        // Descending by worst loading
        for pair in top.windows(2) {
            assert!(pair[0].max_loading_pct >= pair[1].max_loading_pct);
        }
    }

    #[test]
    fn test_failed_hours_flagged_and_excluded_from_peaks() {
        let solver = ScriptedSolver::failing_nonlinear([("L1", 50.0), ("L2", 50.0)]);
        let engine = LoadScalingEngine::new(networks::radial_chain(50.0), Arc::new(solver));
        let analysis = engine.analyze_daily_profile(24).unwrap();

        assert_eq!(analysis.summary.total_hours, 24);
        assert_eq!(analysis.summary.hours_converged, 0);
        assert_eq!(analysis.summary.hours_failed, 24);
        // No converged hour, no peak aggregates.
        assert!(analysis.summary.peak_loading.is_none());
        assert!(analysis.summary.most_stressed_lines.is_empty());
        // Hours are still reported with best-effort linear numbers.
        let hour0 = &analysis.hourly_results[0];
        assert!(!hour0.converged);
        assert!(hour0.solve.linear);
        assert!(!hour0.lines.is_empty());
    }

    #[test]
    fn test_single_hour_validation() {
        let engine = dc_engine(networks::radial_chain(50.0));
        assert!(engine.analyze_single_hour(24).is_err());
        let hour = engine.analyze_single_hour(18).unwrap();
        assert_eq!(hour.hour, 18);
        assert!((hour.scale_factor - 1.1).abs() < 1e-9);
        assert!(hour.converged);
    }

    #[test]
    fn test_daily_profile_rejects_zero_hours() {
        let engine = dc_engine(networks::radial_chain(50.0));
        assert!(engine.analyze_daily_profile(0).is_err());
    }

    #[test]
    fn test_load_profile_totals_without_solving() {
        let engine = dc_engine(networks::radial_chain(100.0));
        let profile = engine.load_profile(24);
        assert_eq!(profile.len(), 24);
        assert!((profile[6].load_mw - 90.0).abs() < 1e-9);
        assert!((profile[18].load_mw - 110.0).abs() < 1e-9);
        assert!((profile[18].gen_mw - 110.0).abs() < 1e-9);
    }
}
