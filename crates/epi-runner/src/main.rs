//! Demo runner: runs one epidemic to stability and reports the outcome.

mod telemetry;

use anyhow::{Context, Result};
use epi_core::{HealthState, SimulationParameters};
use epi_engine::Simulation;
use std::fs;
use tracing::info;

fn load_parameters() -> Result<SimulationParameters> {
    match std::env::args().nth(1) {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("reading parameter file {path}"))?;
            let params = serde_json::from_str(&contents)
                .with_context(|| format!("parsing parameter file {path}"))?;
            Ok(params)
        }
        None => Ok(SimulationParameters::default()),
    }
}

fn main() -> Result<()> {
    telemetry::init_telemetry();

    let params = load_parameters()?;
    info!(
        side_length = params.side_length,
        initial_infections = params.initial_infections,
        droplet_range = params.droplet_range,
        aerosol_range = params.aerosol_range,
        vaccination_step = params.vaccination_step,
        "loaded simulation parameters"
    );

    let mut simulation = Simulation::new(params)?;
    let result = simulation.run_observed(|tick, grid| {
        if tick % 50 == 0 {
            info!(
                tick,
                susceptible = grid.count(HealthState::Susceptible),
                infected = grid.count(HealthState::Infected),
                dead = grid.count(HealthState::Dead),
                "snapshot"
            );
        }
    });

    println!("Outcome: {} after {} steps", result.outcome, result.steps);
    println!("Final death count: {}", result.dead);
    println!("Final death rate: {:.2}%", result.death_rate * 100.0);

    Ok(())
}
