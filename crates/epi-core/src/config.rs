//! Configuration types for the simulator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Probability overrides applied when the pathogen mutates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MutationEffect {
    /// Replacement exposed->infected probability.
    pub p_ei: f64,
    /// Replacement infected->dead probability.
    pub p_id: f64,
}

/// Multiplicative dampening applied to vaccinated-track cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VaccineEffect {
    /// Infection-probability multiplier (0.0 to 1.0).
    pub p_ei: f64,
    /// Death-probability multiplier (0.0 to 1.0).
    pub p_id: f64,
}

impl Default for VaccineEffect {
    fn default() -> Self {
        Self { p_ei: 0.5, p_id: 0.1 }
    }
}

/// Immutable configuration bundle for one simulation run.
///
/// Created once up front and never mutated; applying a mutation effect
/// produces a new bundle via [`with_mutation_applied`].
///
/// [`with_mutation_applied`]: SimulationParameters::with_mutation_applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Side of the square grid.
    pub side_length: i32,
    /// Number of cells seeded Exposed at start.
    pub initial_infections: usize,
    /// Probability of an exposed cell becoming infected (also the per-trial
    /// transmission probability).
    pub p_ei: f64,
    /// Probability of an infected cell recovering.
    pub p_ir: f64,
    /// Probability of an infected cell dying.
    pub p_id: f64,
    /// Droplet transmission radius (cells).
    pub droplet_range: i32,
    /// Aerosol transmission radius (cells).
    pub aerosol_range: i32,
    /// Tick at which the whole population is vaccinated. A value past the
    /// iteration budget means vaccination never happens.
    pub vaccination_step: u64,
    /// Tick at which the pathogen mutates, if any.
    pub mutation_step: Option<u64>,
    /// Probability overrides swapped in at `mutation_step`.
    pub mutation: Option<MutationEffect>,
    pub vaccine: VaccineEffect,
    /// Maximum number of ticks before the run is cut off.
    pub max_iterations: u64,
    /// RNG seed for reproducible runs.
    pub seed: u64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            side_length: 30,
            initial_infections: 5,
            p_ei: 0.1,
            p_ir: 0.05,
            p_id: 0.01,
            droplet_range: 2,
            aerosol_range: 4,
            vaccination_step: 15,
            mutation_step: None,
            mutation: Some(MutationEffect {
                p_ei: 0.3,
                p_id: 0.005,
            }),
            vaccine: VaccineEffect::default(),
            max_iterations: 1000,
            seed: 0,
        }
    }
}

impl SimulationParameters {
    pub fn total_cells(&self) -> usize {
        (self.side_length as usize) * (self.side_length as usize)
    }

    /// Check the bundle before any simulation step runs.
    pub fn validate(&self) -> Result<()> {
        if self.side_length <= 0 {
            return Err(Error::Validation(format!(
                "side_length must be positive, got {}",
                self.side_length
            )));
        }
        if self.initial_infections > self.total_cells() {
            return Err(Error::Validation(format!(
                "initial_infections ({}) exceeds total cells ({})",
                self.initial_infections,
                self.total_cells()
            )));
        }
        for (name, p) in [("p_ei", self.p_ei), ("p_ir", self.p_ir), ("p_id", self.p_id)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Validation(format!(
                    "{} must be in [0, 1], got {}",
                    name, p
                )));
            }
        }
        if let Some(mutation) = &self.mutation {
            for (name, p) in [("mutation.p_ei", mutation.p_ei), ("mutation.p_id", mutation.p_id)] {
                if !(0.0..=1.0).contains(&p) {
                    return Err(Error::Validation(format!(
                        "{} must be in [0, 1], got {}",
                        name, p
                    )));
                }
            }
        }
        for (name, m) in [("vaccine.p_ei", self.vaccine.p_ei), ("vaccine.p_id", self.vaccine.p_id)] {
            if !(0.0..=1.0).contains(&m) {
                return Err(Error::Validation(format!(
                    "{} must be in [0, 1], got {}",
                    name, m
                )));
            }
        }
        if self.droplet_range < 0 || self.aerosol_range < 0 {
            return Err(Error::Validation(format!(
                "transmission ranges must be non-negative, got droplet {} / aerosol {}",
                self.droplet_range, self.aerosol_range
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Validation(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Return a new bundle with the mutation overrides in effect.
    ///
    /// The receiver is left untouched; without configured overrides this is
    /// a plain copy.
    pub fn with_mutation_applied(&self) -> Self {
        let mut params = self.clone();
        if let Some(mutation) = &self.mutation {
            params.p_ei = mutation.p_ei;
            params.p_id = mutation.p_id;
        }
        params
    }
}
