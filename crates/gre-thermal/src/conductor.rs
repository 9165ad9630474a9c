//! Conductor reference data.
//!
//! Conductor libraries publish AC resistance at two reference temperatures
//! (25 and 50 degC by convention) in ohm/mile, plus the core radius in
//! inches. [`ConductorSpec::from_library_row`] applies the unit conversions
//! once at construction so the thermal model works in ohm/ft and diameter.

use gre_core::Celsius;
use serde::{Deserialize, Serialize};

/// AC resistance as a linear function of conductor temperature, anchored at
/// two reference points. Extrapolates linearly beyond the anchors, which is
/// the standard treatment for operating temperatures above the upper anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceCurve {
    pub t_low: Celsius,
    pub t_high: Celsius,
    /// Resistance at `t_low` (ohm/ft)
    pub r_low: f64,
    /// Resistance at `t_high` (ohm/ft)
    pub r_high: f64,
}

impl ResistanceCurve {
    /// Resistance at the given conductor temperature (ohm/ft).
    ///
    /// Degenerate anchors (equal temperatures) return `r_low`.
    pub fn r_at(&self, temp: Celsius) -> f64 {
        let span = self.t_high.value() - self.t_low.value();
        if span.abs() < f64::EPSILON {
            return self.r_low;
        }
        let slope = (self.r_high - self.r_low) / span;
        self.r_low + slope * (temp.value() - self.t_low.value())
    }
}

/// Physical description of a conductor type, immutable reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductorSpec {
    /// Library identifier, e.g. `"795 ACSR 26/7 DRAKE"`
    pub name: String,
    pub resistance: ResistanceCurve,
    /// Outside diameter (inches)
    pub diameter_in: f64,
    /// Thermal design limit; lines may override per-installation
    pub max_operating_temp: Option<Celsius>,
    /// Surface emissivity override; falls back to the weather state's value
    #[serde(default)]
    pub emissivity: Option<f64>,
    /// Solar absorptivity override; falls back to the weather state's value
    #[serde(default)]
    pub absorptivity: Option<f64>,
}

impl ConductorSpec {
    /// Build a spec from a conductor-library record.
    ///
    /// Library rows carry resistance in ohm/mile at 25 and 50 degC and the
    /// conductor radius in inches; this converts to ohm/ft (divide by 5280)
    /// and diameter (radius times two).
    pub fn from_library_row(
        name: impl Into<String>,
        res_25c_ohm_per_mile: f64,
        res_50c_ohm_per_mile: f64,
        radius_in: f64,
        max_operating_temp_c: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            resistance: ResistanceCurve {
                t_low: Celsius(25.0),
                t_high: Celsius(50.0),
                r_low: res_25c_ohm_per_mile / 5280.0,
                r_high: res_50c_ohm_per_mile / 5280.0,
            },
            diameter_in: radius_in * 2.0,
            max_operating_temp: max_operating_temp_c.map(Celsius),
            emissivity: None,
            absorptivity: None,
        }
    }
}
