//! Loading-based stress classification, shared by every analysis.
//!
//! The buckets are a pure function of loading percentage. Boundary values
//! belong to the higher bucket (>=, not >). Anything that is not a finite
//! non-negative number classifies as [`StressLevel::Unknown`], since an unknown
//! loading must never silently read as normal.

use serde::{Deserialize, Serialize};

/// Loading at or above this is worth watching.
pub const CAUTION_THRESHOLD_PCT: f64 = 60.0;
/// Loading at or above this is high stress.
pub const HIGH_STRESS_THRESHOLD_PCT: f64 = 90.0;
/// Loading at or above this is an overload.
pub const OVERLOAD_THRESHOLD_PCT: f64 = 100.0;

/// Stress bucket for one line at one solved instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Normal,
    Caution,
    HighStress,
    Overloaded,
    /// Out of service in the scenario under analysis; wins over any loading
    Outaged,
    /// Loading could not be computed (no rating, non-finite flow)
    Unknown,
}

impl StressLevel {
    /// Classify a loading percentage.
    ///
    /// `None` and non-finite values map to `Unknown`; the tagged optional is
    /// the engine-wide representation for "no meaningful number here", so
    /// NaN never reaches a comparison.
    pub fn from_loading(loading_pct: Option<f64>) -> Self {
        match loading_pct {
            None => StressLevel::Unknown,
            Some(pct) if !pct.is_finite() => StressLevel::Unknown,
            Some(pct) if pct >= OVERLOAD_THRESHOLD_PCT => StressLevel::Overloaded,
            Some(pct) if pct >= HIGH_STRESS_THRESHOLD_PCT => StressLevel::HighStress,
            Some(pct) if pct >= CAUTION_THRESHOLD_PCT => StressLevel::Caution,
            Some(_) => StressLevel::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Normal => "normal",
            StressLevel::Caution => "caution",
            StressLevel::HighStress => "high_stress",
            StressLevel::Overloaded => "overloaded",
            StressLevel::Outaged => "outaged",
            StressLevel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loading percentage of a flow against a rating.
///
/// Returns `None` when the rating is not positive or either input is not
/// finite; a division that would produce NaN or infinity is reported as
/// unknown instead.
pub fn loading_percent(flow_mva: f64, rating_mva: f64) -> Option<f64> {
    if !flow_mva.is_finite() || !rating_mva.is_finite() || rating_mva <= 0.0 {
        return None;
    }
    Some(flow_mva.abs() / rating_mva * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_and_boundaries() {
        assert_eq!(StressLevel::from_loading(Some(0.0)), StressLevel::Normal);
        assert_eq!(StressLevel::from_loading(Some(59.99)), StressLevel::Normal);
        // Boundary values belong to the higher bucket
        assert_eq!(StressLevel::from_loading(Some(60.0)), StressLevel::Caution);
        assert_eq!(StressLevel::from_loading(Some(89.99)), StressLevel::Caution);
        assert_eq!(StressLevel::from_loading(Some(90.0)), StressLevel::HighStress);
        assert_eq!(StressLevel::from_loading(Some(99.99)), StressLevel::HighStress);
        assert_eq!(StressLevel::from_loading(Some(100.0)), StressLevel::Overloaded);
        assert_eq!(StressLevel::from_loading(Some(250.0)), StressLevel::Overloaded);
    }

    #[test]
    fn test_exhaustive_over_sampled_range() {
        // Every finite non-negative loading maps to exactly one of the four
        // loading buckets, and classification is idempotent on the result.
        let mut pct = 0.0;
        while pct < 200.0 {
            let level = StressLevel::from_loading(Some(pct));
            assert!(matches!(
                level,
                StressLevel::Normal
                    | StressLevel::Caution
                    | StressLevel::HighStress
                    | StressLevel::Overloaded
            ));
            assert_eq!(StressLevel::from_loading(Some(pct)), level);
            pct += 0.25;
        }
    }

    #[test]
    fn test_unknown_never_normal() {
        assert_eq!(StressLevel::from_loading(None), StressLevel::Unknown);
        assert_eq!(StressLevel::from_loading(Some(f64::NAN)), StressLevel::Unknown);
        assert_eq!(
            StressLevel::from_loading(Some(f64::INFINITY)),
            StressLevel::Unknown
        );
    }

    #[test]
    fn test_loading_percent_edge_cases() {
        assert_eq!(loading_percent(50.0, 100.0), Some(50.0));
        // Sign of the flow does not matter
        assert_eq!(loading_percent(-50.0, 100.0), Some(50.0));
        assert_eq!(loading_percent(50.0, 0.0), None);
        assert_eq!(loading_percent(50.0, -10.0), None);
        assert_eq!(loading_percent(f64::NAN, 100.0), None);
        assert_eq!(loading_percent(50.0, f64::INFINITY), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&StressLevel::HighStress).unwrap();
        assert_eq!(json, "\"high_stress\"");
        let back: StressLevel = serde_json::from_str("\"outaged\"").unwrap();
        assert_eq!(back, StressLevel::Outaged);
    }
}
