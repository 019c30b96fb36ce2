//! Transition engine, interventions, and the simulation driver.

use crate::grid::Grid;
use crate::neighbors::{contact_neighbors, range_neighbors};
use epi_core::{HealthState, Outcome, Position, Result, RunResult, SimulationParameters};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Distance-decay exponent for the droplet channel.
const DROPLET_DECAY: f64 = 0.5;
/// Distance-decay exponent for the aerosol channel.
const AEROSOL_DECAY: f64 = 0.1;

/// Run the three transmission channels for a susceptible cell.
///
/// Channels run in fixed order (contact, droplet, aerosol) and within each
/// channel neighbors are tested in turn. A draw is taken only against an
/// infectious neighbor, and the first success ends all further checks, so
/// the draw sequence is fully determined by the grid and the channel order.
fn exposure_trial(
    grid: &Grid,
    pos: Position,
    params: &SimulationParameters,
    rng: &mut ChaCha8Rng,
) -> bool {
    for neighbor in contact_neighbors(pos, grid.side()) {
        if grid.get(neighbor).is_infectious() && rng.gen::<f64>() < params.p_ei {
            return true;
        }
    }
    for (neighbor, distance) in range_neighbors(pos, grid.side(), params.droplet_range) {
        if grid.get(neighbor).is_infectious()
            && rng.gen::<f64>() < params.p_ei * (-DROPLET_DECAY * distance).exp()
        {
            return true;
        }
    }
    for (neighbor, distance) in range_neighbors(pos, grid.side(), params.aerosol_range) {
        if grid.get(neighbor).is_infectious()
            && rng.gen::<f64>() < params.p_ei * (-AEROSOL_DECAY * distance).exp()
        {
            return true;
        }
    }
    false
}

/// Death probability for a cell taking the death draw.
///
/// The vaccine dampening keys off the cell's own current state. Only plain
/// Infected cells ever reach the death draw, so the vaccinated-track arm is
/// inert in practice; the condition is kept as modeled rather than rerouted,
/// pinned by `infected_death_draw_ignores_vaccine_multiplier` below.
fn death_rate_for(state: HealthState, params: &SimulationParameters) -> f64 {
    if state.is_vaccinated_track() {
        params.p_id * params.vaccine.p_id
    } else {
        params.p_id
    }
}

/// Apply one simulation step, producing a fresh snapshot.
///
/// The input grid is only read; every cell's update sees the previous
/// snapshot regardless of cell order.
pub fn advance(grid: &Grid, params: &SimulationParameters, rng: &mut ChaCha8Rng) -> Grid {
    let mut next = grid.clone();

    for (pos, state) in grid.iter() {
        let new_state = match state {
            HealthState::Susceptible => {
                if exposure_trial(grid, pos, params, rng) {
                    HealthState::Exposed
                } else {
                    HealthState::Susceptible
                }
            }
            HealthState::Exposed => {
                if rng.gen::<f64>() < params.p_ei {
                    HealthState::Infected
                } else {
                    HealthState::Exposed
                }
            }
            HealthState::Infected => {
                // Recovery draw first; the death draw happens only if it
                // fails, and both failing leaves the cell Infected.
                if rng.gen::<f64>() < params.p_ir {
                    HealthState::Recovered
                } else if rng.gen::<f64>() < death_rate_for(state, params) {
                    HealthState::Dead
                } else {
                    HealthState::Infected
                }
            }
            // Vaccinated-track cells have no autonomous transition.
            HealthState::Vaccinated
            | HealthState::VaccinatedExposed
            | HealthState::VaccinatedInfected => state,
            // Absorbing.
            HealthState::Recovered | HealthState::Dead => state,
        };
        next.set(pos, new_state);
    }

    next
}

/// Population-wide vaccination: every cell not Infected and not Dead becomes
/// Vaccinated. Idempotent, returns a fresh snapshot.
pub fn vaccinate(grid: &Grid) -> Grid {
    let mut next = grid.clone();
    for (pos, state) in grid.iter() {
        if !matches!(state, HealthState::Infected | HealthState::Dead) {
            next.set(pos, HealthState::Vaccinated);
        }
    }
    next
}

/// Driver that owns a grid and runs it to stability or budget exhaustion.
pub struct Simulation {
    grid: Grid,
    /// The bundle as configured; scheduling (vaccination, mutation, budget)
    /// always reads from here.
    params: SimulationParameters,
    /// The probabilities currently in effect; replaced wholesale when the
    /// pathogen mutates.
    active: SimulationParameters,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Simulation {
    /// Validate the parameters, seed the grid, and get ready to run.
    pub fn new(params: SimulationParameters) -> Result<Self> {
        params.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut grid = Grid::new(params.side_length);
        grid.seed_exposed(params.initial_infections, &mut rng);

        Ok(Self {
            grid,
            active: params.clone(),
            params,
            rng,
            tick: 0,
        })
    }

    /// Start from an existing snapshot instead of a freshly seeded grid.
    pub fn from_grid(params: SimulationParameters, grid: Grid) -> Result<Self> {
        params.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        Ok(Self {
            grid,
            active: params.clone(),
            params,
            rng,
            tick: 0,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The parameter bundle currently in effect (post-mutation, if any).
    pub fn active_params(&self) -> &SimulationParameters {
        &self.active
    }

    /// Run interventions scheduled for this tick, then advance the grid.
    pub fn step_once(&mut self) {
        if self.tick == self.params.vaccination_step {
            self.grid = vaccinate(&self.grid);
            info!(tick = self.tick, "population vaccinated");
        }
        if self.params.mutation_step == Some(self.tick) {
            self.active = self.params.with_mutation_applied();
            info!(
                tick = self.tick,
                p_ei = self.active.p_ei,
                p_id = self.active.p_id,
                "pathogen mutation applied"
            );
        }

        self.grid = advance(&self.grid, &self.active, &mut self.rng);
        self.tick += 1;
    }

    /// Run until the grid settles or the iteration budget runs out.
    pub fn run(&mut self) -> RunResult {
        self.run_observed(|_, _| {})
    }

    /// Like [`run`], invoking the observer with every post-tick snapshot.
    ///
    /// [`run`]: Simulation::run
    pub fn run_observed(&mut self, mut observer: impl FnMut(u64, &Grid)) -> RunResult {
        info!(
            side_length = self.params.side_length,
            max_iterations = self.params.max_iterations,
            seed = self.params.seed,
            "starting epidemic run"
        );

        let outcome = loop {
            if self.tick >= self.params.max_iterations {
                break Outcome::BudgetExhausted;
            }

            self.step_once();
            observer(self.tick, &self.grid);

            if self.tick % 100 == 0 {
                debug!(
                    tick = self.tick,
                    exposed = self.grid.count(HealthState::Exposed),
                    infected = self.grid.count(HealthState::Infected),
                    dead = self.grid.count(HealthState::Dead),
                    "progress"
                );
            }

            if self.grid.is_stable() {
                break Outcome::Stable;
            }
        };

        let result = self.collect_result(outcome);
        info!(
            outcome = %result.outcome,
            steps = result.steps,
            dead = result.dead,
            death_rate = format!("{:.2}%", result.death_rate * 100.0),
            "epidemic run finished"
        );
        result
    }

    /// Statistics from the grid as it stands at termination.
    fn collect_result(&self, outcome: Outcome) -> RunResult {
        let dead = self.grid.count(HealthState::Dead);
        let total_cells = self.grid.len();
        RunResult {
            outcome,
            steps: self.tick,
            dead,
            total_cells,
            death_rate: dead as f64 / total_cells as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epi_core::{MutationEffect, VaccineEffect};

    /// Parameters with every stochastic transition switched off.
    fn inert_params(side: i32) -> SimulationParameters {
        SimulationParameters {
            side_length: side,
            initial_infections: 0,
            p_ei: 0.0,
            p_ir: 0.0,
            p_id: 0.0,
            droplet_range: 0,
            aerosol_range: 0,
            vaccination_step: u64::MAX,
            mutation_step: None,
            mutation: None,
            vaccine: VaccineEffect::default(),
            max_iterations: 100,
            seed: 7,
        }
    }

    fn fill(grid: &mut Grid, state: HealthState) {
        for pos in grid.positions().collect::<Vec<_>>() {
            grid.set(pos, state);
        }
    }

    #[test]
    fn test_advance_never_mutates_input() {
        let params = SimulationParameters::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut grid = Grid::new(8);
        grid.seed_exposed(5, &mut rng);
        grid.set(Position::new(0, 0), HealthState::Infected);
        grid.set(Position::new(7, 7), HealthState::Dead);

        let before = grid.clone();
        let _ = advance(&grid, &params, &mut rng);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_dead_and_recovered_are_fixed_points() {
        let mut params = SimulationParameters::default();
        params.p_ei = 1.0;
        params.p_ir = 1.0;
        params.p_id = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let mut grid = Grid::new(4);
        grid.set(Position::new(1, 1), HealthState::Dead);
        grid.set(Position::new(2, 2), HealthState::Recovered);
        grid.set(Position::new(0, 0), HealthState::Infected);

        let next = advance(&grid, &params, &mut rng);
        assert_eq!(next.get(Position::new(1, 1)), HealthState::Dead);
        assert_eq!(next.get(Position::new(2, 2)), HealthState::Recovered);
    }

    #[test]
    fn test_vaccinate_spares_infected_and_dead() {
        let mut grid = Grid::new(3);
        grid.set(Position::new(0, 0), HealthState::Infected);
        grid.set(Position::new(1, 1), HealthState::Dead);
        grid.set(Position::new(2, 2), HealthState::Recovered);
        grid.set(Position::new(0, 2), HealthState::Exposed);

        let vaccinated = vaccinate(&grid);
        assert_eq!(vaccinated.get(Position::new(0, 0)), HealthState::Infected);
        assert_eq!(vaccinated.get(Position::new(1, 1)), HealthState::Dead);
        assert_eq!(vaccinated.get(Position::new(2, 2)), HealthState::Vaccinated);
        assert_eq!(vaccinated.get(Position::new(0, 2)), HealthState::Vaccinated);
        assert_eq!(vaccinated.count(HealthState::Vaccinated), 7);

        // Idempotent.
        assert_eq!(vaccinate(&vaccinated), vaccinated);
    }

    #[test]
    fn test_vaccinated_cells_resist_infection() {
        let mut params = inert_params(3);
        params.p_ei = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut grid = Grid::new(3);
        fill(&mut grid, HealthState::Vaccinated);
        grid.set(Position::new(1, 1), HealthState::Infected);

        let next = advance(&grid, &params, &mut rng);
        for (pos, state) in next.iter() {
            if pos == Position::new(1, 1) {
                assert_eq!(state, HealthState::Infected);
            } else {
                assert_eq!(state, HealthState::Vaccinated);
            }
        }
    }

    #[test]
    fn test_contact_spread_with_certain_transmission() {
        let mut params = inert_params(5);
        params.p_ei = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let centre = Position::new(2, 2);
        let mut grid = Grid::new(5);
        grid.set(centre, HealthState::Infected);

        let next = advance(&grid, &params, &mut rng);

        let expected_exposed = [
            Position::new(3, 2),
            Position::new(1, 2),
            Position::new(2, 3),
            Position::new(2, 1),
            Position::new(3, 1),
            Position::new(1, 3),
        ];
        for pos in expected_exposed {
            assert_eq!(next.get(pos), HealthState::Exposed, "at {}", pos);
        }
        assert_eq!(next.get(centre), HealthState::Infected);
        assert_eq!(next.count(HealthState::Exposed), 6);
        assert_eq!(next.count(HealthState::Susceptible), 25 - 7);
    }

    #[test]
    fn test_all_infected_recover_in_one_step() {
        let mut params = inert_params(3);
        params.p_ir = 1.0;

        let mut grid = Grid::new(3);
        fill(&mut grid, HealthState::Infected);

        let mut sim = Simulation::from_grid(params, grid).unwrap();
        let result = sim.run();

        assert_eq!(result.outcome, Outcome::Stable);
        assert_eq!(result.steps, 1);
        assert_eq!(result.dead, 0);
        assert_eq!(sim.grid().count(HealthState::Recovered), 9);
    }

    #[test]
    fn test_vaccination_at_step_zero_settles_immediately() {
        let mut params = inert_params(4);
        params.vaccination_step = 0;

        let mut grid = Grid::new(4);
        grid.set(Position::new(3, 3), HealthState::Dead);

        let mut sim = Simulation::from_grid(params, grid).unwrap();
        let result = sim.run();

        assert_eq!(result.outcome, Outcome::Stable);
        assert_eq!(result.steps, 1);
        assert_eq!(result.dead, 1);
        assert_eq!(sim.grid().get(Position::new(3, 3)), HealthState::Dead);
        assert_eq!(sim.grid().count(HealthState::Vaccinated), 15);
    }

    #[test]
    fn test_infected_death_draw_ignores_vaccine_multiplier() {
        // The dampening keys off the cell's own state, and a cell in the
        // death draw is always plain Infected, so even a multiplier of zero
        // must not save it.
        let mut params = inert_params(3);
        params.p_id = 1.0;
        params.vaccine = VaccineEffect { p_ei: 0.5, p_id: 0.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        let mut grid = Grid::new(3);
        fill(&mut grid, HealthState::Infected);

        let next = advance(&grid, &params, &mut rng);
        assert_eq!(next.count(HealthState::Dead), 9);
    }

    #[test]
    fn test_death_rate_dampening_applies_only_on_vaccinated_track() {
        let mut params = SimulationParameters::default();
        params.p_id = 0.4;
        params.vaccine.p_id = 0.1;

        assert_eq!(death_rate_for(HealthState::Infected, &params), 0.4);
        let dampened = death_rate_for(HealthState::VaccinatedInfected, &params);
        assert!((dampened - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_identical_seeds_produce_identical_trajectories() {
        let params = SimulationParameters {
            side_length: 12,
            max_iterations: 60,
            seed: 99,
            ..Default::default()
        };

        let mut a = Simulation::new(params.clone()).unwrap();
        let mut b = Simulation::new(params).unwrap();
        assert_eq!(a.grid(), b.grid());

        for _ in 0..20 {
            a.step_once();
            b.step_once();
            assert_eq!(a.grid(), b.grid());
        }
    }

    #[test]
    fn test_identical_seeds_produce_identical_results() {
        let params = SimulationParameters {
            side_length: 15,
            max_iterations: 200,
            seed: 4242,
            ..Default::default()
        };

        let first = Simulation::new(params.clone()).unwrap().run();
        let second = Simulation::new(params).unwrap().run();
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.steps, second.steps);
        assert_eq!(first.dead, second.dead);
    }

    #[test]
    fn test_dead_cells_never_revive() {
        let params = SimulationParameters {
            side_length: 10,
            p_id: 0.2,
            vaccination_step: u64::MAX,
            seed: 21,
            ..Default::default()
        };
        let mut sim = Simulation::new(params).unwrap();

        let mut dead_so_far: Vec<Position> = Vec::new();
        for _ in 0..60 {
            sim.step_once();
            for pos in &dead_so_far {
                assert_eq!(sim.grid().get(*pos), HealthState::Dead);
            }
            dead_so_far = sim
                .grid()
                .iter()
                .filter(|(_, s)| *s == HealthState::Dead)
                .map(|(p, _)| p)
                .collect();
        }
    }

    #[test]
    fn test_budget_exhaustion_is_reported_as_outcome() {
        // Nothing can ever progress past Exposed, so the grid never settles.
        let mut params = inert_params(4);
        params.initial_infections = 3;
        params.max_iterations = 5;

        let mut sim = Simulation::new(params).unwrap();
        let result = sim.run();

        assert_eq!(result.outcome, Outcome::BudgetExhausted);
        assert_eq!(result.steps, 5);
        assert_eq!(result.dead, 0);
        assert_eq!(result.death_rate, 0.0);
    }

    #[test]
    fn test_mutation_swaps_active_parameters() {
        let mut params = inert_params(4);
        params.p_ei = 0.1;
        params.p_id = 0.01;
        params.mutation_step = Some(0);
        params.mutation = Some(MutationEffect {
            p_ei: 0.3,
            p_id: 0.005,
        });

        let mut sim = Simulation::new(params.clone()).unwrap();
        assert_eq!(sim.active_params().p_ei, 0.1);

        sim.step_once();
        assert_eq!(sim.active_params().p_ei, 0.3);
        assert_eq!(sim.active_params().p_id, 0.005);
        // The configured bundle is untouched.
        assert_eq!(sim.params.p_ei, 0.1);
    }

    #[test]
    fn test_observer_sees_every_snapshot() {
        let mut params = inert_params(4);
        params.initial_infections = 2;
        params.max_iterations = 4;

        let mut sim = Simulation::new(params).unwrap();
        let mut seen = Vec::new();
        sim.run_observed(|tick, grid| {
            seen.push((tick, grid.count(HealthState::Exposed)));
        });

        assert_eq!(seen.len(), 4);
        assert_eq!(seen.first().unwrap().0, 1);
        assert_eq!(seen.last().unwrap().0, 4);
        assert!(seen.iter().all(|(_, exposed)| *exposed == 2));
    }

    #[test]
    fn test_invalid_parameters_fail_before_any_step() {
        let params = SimulationParameters {
            p_ei: 1.5,
            ..Default::default()
        };
        assert!(Simulation::new(params).is_err());
    }
}
