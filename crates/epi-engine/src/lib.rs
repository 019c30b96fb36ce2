//! Epidemic simulation engine.
//!
//! This crate implements the 2D grid where the epidemic unfolds: hex-style
//! neighbor geometry, the stochastic per-cell transition engine, the one-shot
//! vaccination intervention, and the driver that runs a grid to stability.

pub mod grid;
pub mod neighbors;
pub mod simulation;

pub use grid::Grid;
pub use simulation::{advance, vaccinate, Simulation};
