//! 2D grid of cell health states.

use epi_core::{HealthState, Position};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A square grid of health states, row-major.
///
/// Grids are immutable snapshots from the engine's point of view: each
/// simulation step reads one grid and allocates its successor, so neighbor
/// reads within a step never see partially applied updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    side: i32,
    cells: Vec<HealthState>,
}

impl Grid {
    /// Create a grid with every cell Susceptible.
    pub fn new(side: i32) -> Self {
        let size = (side * side) as usize;
        Self {
            side,
            cells: vec![HealthState::Susceptible; size],
        }
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.row < self.side && pos.col >= 0 && pos.col < self.side
    }

    /// Get the state at an in-bounds position.
    pub fn get(&self, pos: Position) -> HealthState {
        debug_assert!(self.in_bounds(pos));
        self.cells[self.pos_to_index(pos)]
    }

    /// Set the state at an in-bounds position.
    pub fn set(&mut self, pos: Position, state: HealthState) {
        debug_assert!(self.in_bounds(pos));
        let index = self.pos_to_index(pos);
        self.cells[index] = state;
    }

    /// Mark `count` distinct, uniformly chosen cells Exposed.
    pub fn seed_exposed(&mut self, count: usize, rng: &mut ChaCha8Rng) {
        for index in rand::seq::index::sample(rng, self.cells.len(), count) {
            self.cells[index] = HealthState::Exposed;
        }
    }

    pub fn count(&self, state: HealthState) -> usize {
        self.cells.iter().filter(|&&s| s == state).count()
    }

    /// Whether the epidemic has fully resolved: every cell is Recovered,
    /// Dead, or Vaccinated.
    pub fn is_stable(&self) -> bool {
        self.cells.iter().all(|s| s.is_settled())
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.row * self.side + pos.col) as usize
    }

    /// Get position from index.
    pub fn index_to_pos(&self, index: usize) -> Position {
        let row = (index as i32) / self.side;
        let col = (index as i32) % self.side;
        Position::new(row, col)
    }

    /// Iterator over all positions, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all cells with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (Position, HealthState)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &state)| (self.index_to_pos(i), state))
    }
}
