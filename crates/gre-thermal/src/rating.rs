//! IEEE Std 738 steady-state heat balance.
//!
//! All heat terms are watts per foot of conductor. Inputs use the
//! standard's English-unit correlations: diameter in inches, wind in ft/h
//! (converted from ft/s here), air film properties evaluated at the mean of
//! conductor and ambient temperature, elevation in feet.
//!
//! Convection takes the larger of the natural (no-wind) and forced
//! (wind-driven) correlations; forced convection itself takes the larger of
//! the low-wind and high-wind fits. Using the max keeps the cooling
//! estimate conservative at the crossover, per the standard's convention.
//! Both paths are plain functions combined with `max`; there is no runtime
//! dispatch.

use crate::conductor::ConductorSpec;
use crate::weather::{Atmosphere, WeatherState};
use gre_core::{Amperes, Celsius};

/// Solar total-heat-flux polynomial coefficients (W/ft^2, solar altitude in
/// degrees), clear and industrial atmospheres.
const SOLAR_FLUX_CLEAR: [f64; 7] = [
    -3.9241,
    5.9276,
    -1.7856e-1,
    3.223e-3,
    -3.3549e-5,
    1.8053e-7,
    -3.7868e-10,
];
const SOLAR_FLUX_INDUSTRIAL: [f64; 7] = [
    4.9408,
    1.3202,
    6.1444e-2,
    -2.9411e-3,
    5.07752e-5,
    -4.03627e-7,
    1.22967e-9,
];

/// Breakdown of the heat-balance terms for one rating evaluation (W/ft).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatTerms {
    pub convective_w_per_ft: f64,
    pub radiative_w_per_ft: f64,
    pub solar_w_per_ft: f64,
    /// Conductor AC resistance at the target temperature (ohm/ft)
    pub resistance_ohm_per_ft: f64,
}

impl HeatTerms {
    /// Evaluate every term of the balance at the target temperature.
    pub fn evaluate(conductor: &ConductorSpec, weather: &WeatherState, target: Celsius) -> Self {
        let emissivity = conductor.emissivity.unwrap_or(weather.emissivity);
        let absorptivity = conductor.absorptivity.unwrap_or(weather.absorptivity);
        Self {
            convective_w_per_ft: convective_loss(conductor.diameter_in, weather, target),
            radiative_w_per_ft: radiative_loss(
                conductor.diameter_in,
                emissivity,
                weather.ambient,
                target,
            ),
            solar_w_per_ft: solar_gain(conductor.diameter_in, absorptivity, weather),
            resistance_ohm_per_ft: conductor.resistance.r_at(target),
        }
    }

    /// Solve the balance for current: `I = sqrt(max(0, qc + qr - qs) / R)`.
    ///
    /// A non-positive numerator (net heating exceeds cooling) yields 0 A:
    /// the line cannot be continuously loaded under these conditions. A
    /// non-positive resistance is meaningless library data and also yields
    /// 0 A rather than an error.
    pub fn rating(&self) -> Amperes {
        if self.resistance_ohm_per_ft <= 0.0 {
            return Amperes(0.0);
        }
        let numerator =
            (self.convective_w_per_ft + self.radiative_w_per_ft - self.solar_w_per_ft).max(0.0);
        Amperes((numerator / self.resistance_ohm_per_ft).sqrt())
    }
}

/// Maximum steady-state current holding the conductor at `target`.
pub fn steady_state_rating(
    conductor: &ConductorSpec,
    weather: &WeatherState,
    target: Celsius,
) -> Amperes {
    HeatTerms::evaluate(conductor, weather, target).rating()
}

/// Convective heat loss (W/ft): max of natural and forced convection.
fn convective_loss(diameter_in: f64, weather: &WeatherState, target: Celsius) -> f64 {
    let delta_t = target.value() - weather.ambient.value();
    if delta_t <= 0.0 {
        // Air is as hot as the conductor; convection cannot cool it.
        return 0.0;
    }

    let t_film = (target.value() + weather.ambient.value()) / 2.0;
    let rho = air_density(t_film, weather.elevation_ft);
    let natural = 0.283 * rho.sqrt() * diameter_in.powf(0.75) * delta_t.powf(1.25);

    let wind_ft_per_hr = weather.wind_speed_ft_s * 3600.0;
    if wind_ft_per_hr <= 0.0 {
        return natural;
    }

    let mu = air_viscosity(t_film);
    let k_f = air_conductivity(t_film);
    let reynolds = diameter_in * rho * wind_ft_per_hr / mu;
    let k_angle = wind_direction_factor(weather.wind_angle_deg);

    let forced_low = (1.01 + 0.371 * reynolds.powf(0.52)) * k_f * k_angle * delta_t;
    let forced_high = 0.1695 * reynolds.powf(0.6) * k_f * k_angle * delta_t;

    natural.max(forced_low.max(forced_high))
}

/// Radiated heat loss (W/ft), Stefan-Boltzmann fit with temperatures in
/// kelvin over 100.
fn radiative_loss(diameter_in: f64, emissivity: f64, ambient: Celsius, target: Celsius) -> f64 {
    let tc = (target.value() + 273.0) / 100.0;
    let ta = (ambient.value() + 273.0) / 100.0;
    0.138 * diameter_in * emissivity * (tc.powi(4) - ta.powi(4))
}

/// Solar heat gain (W/ft). Zero whenever the sun is at or below the horizon.
fn solar_gain(diameter_in: f64, absorptivity: f64, weather: &WeatherState) -> f64 {
    let latitude = weather.latitude_deg.to_radians();
    let declination = (23.46
        * ((284.0 + weather.day_of_year() as f64) / 365.0 * 360.0)
            .to_radians()
            .sin())
    .to_radians();
    let hour_angle_deg = (weather.sun_time - 12.0) * 15.0;
    let hour_angle = hour_angle_deg.to_radians();

    // Clamp the trig arguments: rounding can push them a hair past 1 when
    // the sun is directly overhead, and asin/acos return NaN outside [-1, 1].
    let altitude = (latitude.cos() * declination.cos() * hour_angle.cos()
        + latitude.sin() * declination.sin())
    .clamp(-1.0, 1.0)
    .asin();
    let altitude_deg = altitude.to_degrees();
    if altitude_deg <= 0.0 {
        return 0.0;
    }

    // Solar azimuth from the hour angle and the azimuth variable chi.
    let chi = hour_angle.sin()
        / (latitude.sin() * hour_angle.cos() - latitude.cos() * declination.tan());
    let quadrant = if (-180.0..0.0).contains(&hour_angle_deg) {
        if chi >= 0.0 {
            0.0
        } else {
            180.0
        }
    } else if chi >= 0.0 {
        180.0
    } else {
        360.0
    };
    // chi is 0/0 when the sun passes directly overhead; pin the azimuth due
    // south there instead of letting NaN run through the incidence angle.
    let azimuth_deg = if chi.is_nan() {
        180.0
    } else {
        quadrant + chi.atan().to_degrees()
    };

    let flux = total_solar_flux(altitude_deg, weather.atmosphere);
    let elevation_factor = 1.0 + 3.5e-5 * weather.elevation_ft - 1.0e-9 * weather.elevation_ft.powi(2);
    let corrected_flux = (flux * elevation_factor).max(0.0);

    // Effective incidence angle between the sun and the line axis.
    let incidence = (altitude.cos()
        * (azimuth_deg - weather.orientation.azimuth_deg())
            .to_radians()
            .cos())
    .clamp(-1.0, 1.0)
    .acos();

    let projected_area_ft2_per_ft = diameter_in / 12.0;
    absorptivity * corrected_flux * incidence.sin() * projected_area_ft2_per_ft
}

/// Wind direction factor; 1.0 for perpendicular wind, smaller for parallel.
fn wind_direction_factor(wind_angle_deg: f64) -> f64 {
    let phi = wind_angle_deg.to_radians();
    1.194 - phi.cos() + 0.194 * (2.0 * phi).cos() + 0.368 * (2.0 * phi).sin()
}

/// Air density at the film temperature and elevation (lb/ft^3).
fn air_density(t_film: f64, elevation_ft: f64) -> f64 {
    (0.080695 - 2.901e-6 * elevation_ft + 3.7e-11 * elevation_ft.powi(2))
        / (1.0 + 0.00367 * t_film)
}

/// Dynamic viscosity of air at the film temperature (lb/ft-hr).
fn air_viscosity(t_film: f64) -> f64 {
    0.00353 * (t_film + 273.0).powf(1.5) / (t_film + 383.4)
}

/// Thermal conductivity of air at the film temperature (W/ft-degC).
fn air_conductivity(t_film: f64) -> f64 {
    0.007388 + 2.27889e-5 * t_film - 1.34328e-9 * t_film.powi(2)
}

/// Total solar heat flux at the given altitude (W/ft^2).
fn total_solar_flux(altitude_deg: f64, atmosphere: Atmosphere) -> f64 {
    let coeffs = match atmosphere {
        Atmosphere::Clear => &SOLAR_FLUX_CLEAR,
        Atmosphere::Industrial => &SOLAR_FLUX_INDUSTRIAL,
    };
    coeffs
        .iter()
        .enumerate()
        .map(|(i, c)| c * altitude_deg.powi(i as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::ConductorSpec;
    use crate::weather::WeatherState;

    fn drake() -> ConductorSpec {
        // 795 kcmil 26/7 ACSR; resistance in ohm/mile at the library anchors
        ConductorSpec::from_library_row("DRAKE", 0.1166, 0.1278, 0.554, Some(100.0))
    }

    fn night() -> WeatherState {
        WeatherState::new().with_sun_time(0.0)
    }

    #[test]
    fn test_known_conditions_plausible_rating() {
        // The standard's worked Drake example (40 degC ambient, 2 ft/s wind,
        // 100 degC conductor, full summer sun) lands near 1000 A.
        let weather = WeatherState::new().with_ambient(40.0).with_latitude(30.0);
        let amps = steady_state_rating(&drake(), &weather, Celsius(100.0));
        assert!(
            amps.value() > 850.0 && amps.value() < 1150.0,
            "unexpected rating {amps}"
        );
    }

    #[test]
    fn test_more_wind_never_lowers_rating() {
        let conductor = drake();
        let mut previous = 0.0;
        for step in 0..30 {
            let weather = night().with_wind_speed(step as f64 * 0.5);
            let amps = steady_state_rating(&conductor, &weather, Celsius(75.0)).value();
            assert!(
                amps >= previous - 1e-9,
                "rating dropped from {previous} to {amps} at wind step {step}"
            );
            previous = amps;
        }
    }

    #[test]
    fn test_hotter_ambient_never_raises_rating() {
        let conductor = drake();
        let mut previous = f64::INFINITY;
        for step in 0..12 {
            let ambient = 10.0 + step as f64 * 4.0;
            let weather = night().with_ambient(ambient);
            let amps = steady_state_rating(&conductor, &weather, Celsius(75.0)).value();
            assert!(
                amps <= previous + 1e-9,
                "rating rose from {previous} to {amps} at ambient {ambient}"
            );
            previous = amps;
        }
    }

    #[test]
    fn test_solar_gain_zero_at_night() {
        let terms = HeatTerms::evaluate(&drake(), &night(), Celsius(75.0));
        assert_eq!(terms.solar_w_per_ft, 0.0);

        let noon = HeatTerms::evaluate(&drake(), &WeatherState::new(), Celsius(75.0));
        assert!(noon.solar_w_per_ft > 0.0);
    }

    #[test]
    fn test_night_rating_exceeds_noon_rating() {
        let conductor = drake();
        let at_night = steady_state_rating(&conductor, &night(), Celsius(75.0));
        let at_noon = steady_state_rating(&conductor, &WeatherState::new(), Celsius(75.0));
        assert!(at_night.value() > at_noon.value());
    }

    #[test]
    fn test_net_heating_clamps_to_zero() {
        // Target at ambient: no convective or radiative cooling, noon sun.
        let weather = WeatherState::new().with_ambient(50.0);
        let amps = steady_state_rating(&drake(), &weather, Celsius(50.0));
        assert_eq!(amps.value(), 0.0);
    }

    #[test]
    fn test_nonpositive_resistance_yields_zero() {
        let mut conductor = drake();
        conductor.resistance.r_low = 0.0;
        conductor.resistance.r_high = 0.0;
        let amps = steady_state_rating(&conductor, &night(), Celsius(75.0));
        assert_eq!(amps.value(), 0.0);
    }

    #[test]
    fn test_wind_direction_factor_bounds() {
        // Perpendicular wind cools best; parallel wind worst.
        let perpendicular = wind_direction_factor(90.0);
        let parallel = wind_direction_factor(0.0);
        assert!((perpendicular - 1.0).abs() < 1e-6);
        assert!(parallel < perpendicular);
        assert!(parallel > 0.0);
    }

    #[test]
    fn test_industrial_atmosphere_lowers_flux() {
        // Heavy aerosol loading attenuates solar flux at high sun.
        let clear = total_solar_flux(60.0, Atmosphere::Clear);
        let industrial = total_solar_flux(60.0, Atmosphere::Industrial);
        assert!(clear > industrial);
        assert!(clear > 0.0 && industrial > 0.0);
    }

    #[test]
    fn test_natural_convection_is_no_wind_limit() {
        let conductor = drake();
        let still = night().with_wind_speed(0.0);
        let terms = HeatTerms::evaluate(&conductor, &still, Celsius(75.0));
        assert!(terms.convective_w_per_ft > 0.0);
    }
}
