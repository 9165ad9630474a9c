//! `gre`: grid rating and contingency analysis from the command line.
//!
//! Loads a serde_json grid description and runs one of the three analyses,
//! printing the result as pretty JSON on stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gre_engine::{
    daily_profile, solve_with_fallback, ContingencyEngine, DcFlowSolver, FlowSolver,
    LoadScalingEngine, ProfilePoint, RatingEngine, DEFAULT_POWER_FACTOR,
};
use gre_thermal::WeatherState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

mod grid_file;

#[derive(Parser)]
#[command(
    name = "gre",
    version,
    about = "Grid rating and contingency analysis engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate every line under the given weather and classify solved flows
    Rate {
        /// Grid description file (JSON)
        grid: PathBuf,
        /// Ambient temperature (degC)
        #[arg(long)]
        ambient_c: Option<f64>,
        /// Wind speed (ft/s)
        #[arg(long)]
        wind_ft_s: Option<f64>,
        /// Local sun time (hours)
        #[arg(long)]
        sun_time: Option<f64>,
        /// Assumed power factor for MW -> MVA conversion
        #[arg(long, default_value_t = DEFAULT_POWER_FACTOR)]
        power_factor: f64,
    },
    /// Remove lines from service, re-solve, and report the impact
    Outage {
        /// Grid description file (JSON)
        grid: PathBuf,
        /// Comma-separated line names to remove
        #[arg(long, value_delimiter = ',', required = true)]
        lines: Vec<String>,
        /// Use the linear solve directly instead of as a fallback
        #[arg(long)]
        linear: bool,
    },
    /// Replay the daily demand curve and find peak-stress hours
    Daily {
        /// Grid description file (JSON)
        grid: PathBuf,
        /// Hours in the profile
        #[arg(long, default_value_t = 24)]
        hours: usize,
    },
    /// Print the demand scale factors without solving anything
    Profile {
        /// Hours in the profile
        #[arg(long, default_value_t = 24)]
        hours: usize,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Rate {
            grid,
            ambient_c,
            wind_ft_s,
            sun_time,
            power_factor,
        } => {
            let (network, conductors) = grid_file::load_grid(&grid)?;
            info!("loaded network: {}", network.stats());

            let mut weather = WeatherState::default();
            if let Some(ambient) = ambient_c {
                weather = weather.with_ambient(ambient);
            }
            if let Some(wind) = wind_ft_s {
                weather = weather.with_wind_speed(wind);
            }
            if let Some(hour) = sun_time {
                weather = weather.with_sun_time(hour);
            }

            let solver = DcFlowSolver::new();
            let (solution, solve_info) = solve_with_fallback(&solver, &network, false);
            info!(converged = solve_info.converged, "flow solve complete");

            let engine =
                RatingEngine::new(Arc::new(conductors)).with_power_factor(power_factor);
            let rated = engine.rate_with_solved_flows(&network, &weather, &solution.flows_mw)?;
            print_json(&rated)?;
        }
        Commands::Outage { grid, lines, linear } => {
            let (network, _) = grid_file::load_grid(&grid)?;
            info!("loaded network: {}", network.stats());

            let solver: Arc<dyn FlowSolver> = Arc::new(DcFlowSolver::new());
            let engine = ContingencyEngine::new(network, solver);
            let result = engine.simulate_outage(&lines, linear)?;
            print_json(&result)?;
        }
        Commands::Daily { grid, hours } => {
            let (network, _) = grid_file::load_grid(&grid)?;
            info!("loaded network: {}", network.stats());

            let solver: Arc<dyn FlowSolver> = Arc::new(DcFlowSolver::new());
            let engine = LoadScalingEngine::new(network, solver);
            let analysis = engine.analyze_daily_profile(hours)?;
            print_json(&analysis)?;
        }
        Commands::Profile { hours } => {
            let points: Vec<ProfilePoint> = daily_profile(hours)
                .into_iter()
                .enumerate()
                .map(|(hour, scale_factor)| ProfilePoint { hour, scale_factor })
                .collect();
            print_json(&points)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
