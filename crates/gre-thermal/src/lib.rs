//! # gre-thermal: Steady-State Conductor Thermal Model
//!
//! Closed-form IEEE Std 738 heat balance: given a conductor's physical
//! properties, a weather state, and a target conductor temperature, compute
//! the maximum continuous current (ampacity) that holds the conductor at
//! that temperature.
//!
//! The balance equates cooling and heating per foot of conductor:
//!
//! ```text
//! q_convective + q_radiative = q_solar + I^2 * R(T_target)
//! ```
//!
//! With the target temperature fixed at the conductor's maximum operating
//! temperature, current is the only unknown and the equation solves
//! algebraically; no iteration is involved. See [`steady_state_rating`].
//!
//! Everything in this crate is a pure function of its inputs: no state, no
//! I/O, no dispatch. Callers that need fallbacks for missing conductor data
//! implement them upstream; this crate only answers the physics question.
//!
//! Quantities follow the standard's English-unit formulation (conductor
//! diameter in inches, resistance in ohm/ft, wind in ft/s, elevation in ft,
//! heat terms in W/ft), which matches how conductor libraries publish their
//! data.

pub mod conductor;
pub mod rating;
pub mod weather;

pub use conductor::{ConductorSpec, ResistanceCurve};
pub use rating::{steady_state_rating, HeatTerms};
pub use weather::{Atmosphere, LineOrientation, WeatherState};
