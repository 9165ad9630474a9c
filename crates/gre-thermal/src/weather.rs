//! Weather state for thermal rating.
//!
//! Every field has a default; a caller may supply any subset. Defaults are
//! deliberately conservative for a warm coastal service territory: light
//! wind, noon sun in mid June, low latitude.

use chrono::{Datelike, NaiveDate};
use gre_core::{Celsius, GridError, GridResult};
use serde::{Deserialize, Serialize};

/// Compass orientation of the line route, used for the solar incidence
/// angle. Routes are approximated by their dominant axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrientation {
    #[default]
    EastWest,
    NorthSouth,
}

impl LineOrientation {
    /// Line azimuth in degrees from north.
    pub fn azimuth_deg(self) -> f64 {
        match self {
            LineOrientation::EastWest => 90.0,
            LineOrientation::NorthSouth => 0.0,
        }
    }
}

/// Atmospheric clarity class selecting the solar heat-flux polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atmosphere {
    #[default]
    Clear,
    Industrial,
}

/// Ambient conditions for a rating calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherState {
    /// Ambient air temperature
    pub ambient: Celsius,
    /// Wind speed (ft/s)
    pub wind_speed_ft_s: f64,
    /// Angle between wind and line axis (degrees; 90 = perpendicular)
    pub wind_angle_deg: f64,
    /// Local sun time (hours, 0-24)
    pub sun_time: f64,
    /// Calendar date; only the day of year enters the solar position
    pub date: NaiveDate,
    /// Elevation above sea level (ft)
    pub elevation_ft: f64,
    /// Site latitude (degrees, north positive)
    pub latitude_deg: f64,
    /// Conductor surface emissivity, unless the conductor overrides it
    pub emissivity: f64,
    /// Conductor solar absorptivity, unless the conductor overrides it
    pub absorptivity: f64,
    pub orientation: LineOrientation,
    pub atmosphere: Atmosphere,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            ambient: Celsius(25.0),
            wind_speed_ft_s: 2.0,
            wind_angle_deg: 90.0,
            sun_time: 12.0,
            date: default_date(),
            elevation_ft: 1000.0,
            latitude_deg: 21.0,
            emissivity: 0.8,
            absorptivity: 0.8,
            orientation: LineOrientation::EastWest,
            atmosphere: Atmosphere::Clear,
        }
    }
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 12).expect("valid default date")
}

impl WeatherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ambient temperature (degC).
    pub fn with_ambient(mut self, ambient_c: f64) -> Self {
        self.ambient = Celsius(ambient_c);
        self
    }

    /// Set wind speed (ft/s).
    pub fn with_wind_speed(mut self, ft_per_s: f64) -> Self {
        self.wind_speed_ft_s = ft_per_s;
        self
    }

    /// Set the wind-to-line angle (degrees).
    pub fn with_wind_angle(mut self, degrees: f64) -> Self {
        self.wind_angle_deg = degrees;
        self
    }

    /// Set local sun time (hours).
    pub fn with_sun_time(mut self, hours: f64) -> Self {
        self.sun_time = hours;
        self
    }

    /// Set site latitude (degrees).
    pub fn with_latitude(mut self, degrees: f64) -> Self {
        self.latitude_deg = degrees;
        self
    }

    /// Set the calendar date used for the solar declination.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Day of year (1-366) for the solar declination term.
    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }

    /// Reject physically meaningless inputs before any rating runs.
    ///
    /// Malformed weather is an input validation error, not a degradation:
    /// nothing downstream can classify against a rating computed from a
    /// negative wind speed.
    pub fn validate(&self) -> GridResult<()> {
        let checks: [(bool, &str); 7] = [
            (
                self.wind_speed_ft_s >= 0.0 && self.wind_speed_ft_s.is_finite(),
                "wind speed must be a finite value >= 0 ft/s",
            ),
            (
                (0.0..=360.0).contains(&self.wind_angle_deg),
                "wind angle must be within 0-360 degrees",
            ),
            (
                (-50.0..=60.0).contains(&self.ambient.value()),
                "ambient temperature must be within -50 to 60 degC",
            ),
            (
                (0.0..=24.0).contains(&self.sun_time),
                "sun time must be within 0-24 hours",
            ),
            (
                (-90.0..=90.0).contains(&self.latitude_deg),
                "latitude must be within -90 to 90 degrees",
            ),
            (
                (-1000.0..=20000.0).contains(&self.elevation_ft),
                "elevation must be within -1000 to 20000 ft",
            ),
            (
                (0.0..=1.0).contains(&self.emissivity) && (0.0..=1.0).contains(&self.absorptivity),
                "emissivity and absorptivity must be within 0-1",
            ),
        ];
        for (ok, message) in checks {
            if !ok {
                return Err(GridError::Validation(message.to_string()));
            }
        }
        Ok(())
    }
}
