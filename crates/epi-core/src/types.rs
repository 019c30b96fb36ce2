//! Core type definitions for the simulator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health state of a single grid cell.
///
/// The vaccinated-family states form a modified-risk track: a cell is either
/// on the plain track or the vaccinated track, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Susceptible,
    Exposed,
    Infected,
    Recovered,
    Dead,
    Vaccinated,
    VaccinatedExposed,
    VaccinatedInfected,
}

impl HealthState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HealthState::Recovered | HealthState::Dead)
    }

    /// Whether the cell sheds pathogen to its neighbors.
    pub fn is_infectious(&self) -> bool {
        matches!(self, HealthState::Infected)
    }

    pub fn is_vaccinated_track(&self) -> bool {
        matches!(
            self,
            HealthState::Vaccinated
                | HealthState::VaccinatedExposed
                | HealthState::VaccinatedInfected
        )
    }

    /// Whether the cell counts toward the stable terminal condition.
    ///
    /// Exposed/Infected cells on either track keep the epidemic unresolved.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            HealthState::Recovered | HealthState::Dead | HealthState::Vaccinated
        )
    }
}

/// 2D cell coordinate on the grid, as (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn add(&self, dr: i32, dc: i32) -> Self {
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Euclidean distance to another position.
    pub fn euclidean_distance(&self, other: &Position) -> f64 {
        let dr = (self.row - other.row) as f64;
        let dc = (self.col - other.col) as f64;
        (dr * dr + dc * dc).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// How a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every cell is Recovered, Dead, or Vaccinated.
    Stable,
    /// The iteration budget ran out before the grid settled.
    BudgetExhausted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Stable => write!(f, "stable"),
            Outcome::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// Final statistics of a simulation run, derived from the terminal grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub outcome: Outcome,
    /// Number of ticks executed before termination.
    pub steps: u64,
    pub dead: usize,
    pub total_cells: usize,
    /// dead / total_cells
    pub death_rate: f64,
}
