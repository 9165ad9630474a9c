//! # gre-engine: Rating, Contingency, and Load-Scaling Analyses
//!
//! The three analyses that turn a topology plus scenario parameters into
//! classified, comparable result records:
//!
//! | Engine | Question it answers |
//! |--------|---------------------|
//! | [`RatingEngine`] | How much can each line carry under this weather? |
//! | [`ContingencyEngine`] | What happens when these lines trip? |
//! | [`LoadScalingEngine`] | Which hours of the day stress the system most? |
//!
//! All three share the [`classify`] stress buckets and the [`solver`]
//! collaborator boundary. Data flows one way: topology and scenario
//! parameters in, immutable result records out. Nothing here persists
//! state between requests; every scenario evaluation owns its snapshot
//! exclusively (see [`arena`]).
//!
//! ## Example
//!
//! ```no_run
//! use gre_engine::{ContingencyEngine, DcFlowSolver};
//! use gre_core::Network;
//! use std::sync::Arc;
//!
//! # fn load_network() -> Network { Network::new() }
//! let network = load_network();
//! let engine = ContingencyEngine::new(network, Arc::new(DcFlowSolver::new()));
//!
//! let result = engine.simulate_outage(&["L48".to_string()], false)?;
//! println!(
//!     "{} overloaded, {} islanded",
//!     result.metrics.overloaded_count,
//!     result.metrics.islanded_count
//! );
//! # Ok::<(), gre_core::GridError>(())
//! ```

pub mod arena;
pub mod classify;
pub mod contingency;
pub mod load_scaling;
pub mod rating;
pub mod solver;
pub mod test_support;

pub use arena::ConductorLibrary;
pub use classify::{
    loading_percent, StressLevel, CAUTION_THRESHOLD_PCT, HIGH_STRESS_THRESHOLD_PCT,
    OVERLOAD_THRESHOLD_PCT,
};
pub use contingency::{
    ContingencyEngine, ContingencyMetrics, ContingencyResult, LineCandidate, LineImpact,
    ScenarioOutcome, AFFECTED_CHANGE_THRESHOLD_PCT,
};
pub use load_scaling::{
    daily_profile, DailyAnalysis, DailySummary, HourLineLoading, HourlyResult, LoadScalingEngine,
    PeakHour, ProfilePoint, ProfileTotals, StressedLine, DEFAULT_HOURS, MOST_STRESSED_TOP_N,
};
pub use rating::{
    MostLoadedLine, RatedLines, RatingEngine, RatingResult, RatingSource, RatingSummary,
    SweepPoint, ThresholdSweep, DEFAULT_POWER_FACTOR, MOT_CLAMP_MAX_C, MOT_CLAMP_MIN_C,
};
pub use solver::{
    solve_with_fallback, DcFlowSolver, FlowSolution, FlowSolver, SolveInfo, SolveMode,
};
